//! Workflow sessions: phases, transition tables and the busy flag.
//!
//! Each workflow owns one [`SessionCell`]. Phases only change through
//! [`Phase::on`], so the transition table is the single source of truth for
//! which event is legal where.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use vaultlink_core::DelegationProof;
use vaultlink_store::LocationRef;

use crate::clients::Clients;
use crate::error::{ErrorKind, Result, WorkflowError};
use crate::loader::DelegationLoader;

/// Discrete inputs that drive a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A delegation was parsed and bound.
    DelegationBound,
    /// Loading a delegation failed.
    DelegationRejected(ErrorKind),
    /// A file (upload) or a CID and identity (download) was submitted.
    Started,
    /// The running operation finished.
    Succeeded,
    /// The running operation failed.
    OperationFailed(ErrorKind),
    /// The caller asked to start over.
    Reset { proof_bound: bool },
}

/// A workflow phase with its transition table.
pub trait Phase: Copy + Eq + fmt::Debug + Send + 'static {
    const INITIAL: Self;

    /// Next phase, or `None` if `event` is not accepted here.
    fn on(self, event: Event) -> Option<Self>;
}

/// Upload phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    AwaitingDelegation,
    DelegationBound,
    Uploading,
    Completed,
    Failed(ErrorKind),
}

impl Phase for UploadPhase {
    const INITIAL: Self = UploadPhase::AwaitingDelegation;

    fn on(self, event: Event) -> Option<Self> {
        use UploadPhase::*;
        match (self, event) {
            (Uploading, Event::Succeeded) => Some(Completed),
            (Uploading, Event::OperationFailed(kind)) => Some(Failed(kind)),
            (Uploading, _) => None,

            (AwaitingDelegation | DelegationBound | Completed | Failed(_), Event::DelegationBound) => {
                Some(DelegationBound)
            }
            (
                AwaitingDelegation | DelegationBound | Completed | Failed(_),
                Event::DelegationRejected(kind),
            ) => Some(Failed(kind)),

            (DelegationBound | Failed(_), Event::Started) => Some(Uploading),
            (AwaitingDelegation | Completed, Event::Started) => None,

            (Completed | Failed(_), Event::Reset { proof_bound: true }) => Some(DelegationBound),
            (Completed | Failed(_), Event::Reset { proof_bound: false }) => Some(AwaitingDelegation),
            (AwaitingDelegation | DelegationBound, Event::Reset { .. }) => None,

            (_, Event::Succeeded | Event::OperationFailed(_)) => None,
        }
    }
}

/// Download phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    AwaitingDelegation,
    DelegationBound,
    Decrypting,
    Completed,
    Failed(ErrorKind),
}

impl Phase for DownloadPhase {
    const INITIAL: Self = DownloadPhase::AwaitingDelegation;

    fn on(self, event: Event) -> Option<Self> {
        use DownloadPhase::*;
        match (self, event) {
            (Decrypting, Event::Succeeded) => Some(Completed),
            (Decrypting, Event::OperationFailed(kind)) => Some(Failed(kind)),
            (Decrypting, _) => None,

            (AwaitingDelegation | DelegationBound | Completed | Failed(_), Event::DelegationBound) => {
                Some(DelegationBound)
            }
            (
                AwaitingDelegation | DelegationBound | Completed | Failed(_),
                Event::DelegationRejected(kind),
            ) => Some(Failed(kind)),

            // A finished download may be followed by another one directly.
            (DelegationBound | Completed | Failed(_), Event::Started) => Some(Decrypting),
            (AwaitingDelegation, Event::Started) => None,

            (Completed | Failed(_), Event::Reset { proof_bound: true }) => Some(DelegationBound),
            (Completed | Failed(_), Event::Reset { proof_bound: false }) => Some(AwaitingDelegation),
            (AwaitingDelegation | DelegationBound, Event::Reset { .. }) => None,

            (_, Event::Succeeded | Event::OperationFailed(_)) => None,
        }
    }
}

/// Snapshot of a workflow session.
#[derive(Debug, Clone)]
pub struct Session<P> {
    pub phase: P,
    pub proof: Option<Arc<DelegationProof>>,
    pub location: Option<LocationRef>,
    pub last_error: Option<WorkflowError>,
}

impl<P: Phase> Session<P> {
    fn new() -> Self {
        Self {
            phase: P::INITIAL,
            proof: None,
            location: None,
            last_error: None,
        }
    }

    /// The bound proof and its location, if any.
    pub fn binding(&self) -> Option<(Arc<DelegationProof>, LocationRef)> {
        match (&self.proof, self.location) {
            (Some(proof), Some(location)) => Some((proof.clone(), location)),
            _ => None,
        }
    }
}

/// Session-local flag that serializes operations.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    /// Claim the session, or `None` if an operation is running.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the [`BusyFlag`] on drop.
#[derive(Debug)]
pub struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Busy flag plus session state for one workflow.
pub struct SessionCell<P> {
    name: &'static str,
    busy: BusyFlag,
    session: Mutex<Session<P>>,
}

impl<P: Phase> SessionCell<P> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: BusyFlag::default(),
            session: Mutex::new(Session::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session<P>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Session<P> {
        self.lock().clone()
    }

    pub fn phase(&self) -> P {
        self.lock().phase
    }

    pub fn last_error(&self) -> Option<WorkflowError> {
        self.lock().last_error.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Claim the session for one operation.
    pub fn acquire(&self) -> Result<BusyGuard<'_>> {
        self.busy.try_acquire().ok_or_else(|| {
            debug!(workflow = self.name, "rejected: operation in progress");
            WorkflowError::OperationInProgress(format!("{} already running", self.name))
        })
    }

    /// Apply `Started`, returning the bound proof and location.
    ///
    /// Rejected with `NotReady` when the phase does not accept it or no
    /// delegation is bound.
    pub fn start(&self) -> Result<(Arc<DelegationProof>, LocationRef)> {
        let mut session = self.lock();
        let not_ready = || {
            WorkflowError::NotReady(format!("{} cannot start from {:?}", self.name, session.phase))
        };
        let binding = session.binding().ok_or_else(not_ready)?;
        let next = session.phase.on(Event::Started).ok_or_else(not_ready)?;

        debug!(workflow = self.name, from = ?session.phase, to = ?next, "transition");
        session.phase = next;
        session.last_error = None;
        Ok(binding)
    }

    /// Apply `Succeeded`.
    pub fn succeed(&self) {
        self.apply(Event::Succeeded);
    }

    /// Record `err` and move to `Failed`. Returns `err` for propagation.
    ///
    /// Kinds that do not transition leave the session as it was.
    pub fn fail(&self, err: WorkflowError) -> WorkflowError {
        if !err.kind().transitions() {
            debug!(workflow = self.name, kind = %err.kind(), "rejected without transition");
            return err;
        }
        warn!(workflow = self.name, kind = %err.kind(), error = %err, "operation failed");
        let mut session = self.lock();
        let next = session
            .phase
            .on(Event::OperationFailed(err.kind()))
            .unwrap_or(session.phase);
        session.phase = next;
        session.last_error = Some(err.clone());
        err
    }

    /// Return to `DelegationBound` (or `AwaitingDelegation` without a proof).
    pub fn reset(&self) -> Result<P> {
        let _guard = self.acquire()?;
        let mut session = self.lock();
        let proof_bound = session.binding().is_some();
        let next = session
            .phase
            .on(Event::Reset { proof_bound })
            .ok_or_else(|| {
                WorkflowError::NotReady(format!("nothing to reset in {:?}", session.phase))
            })?;

        debug!(workflow = self.name, from = ?session.phase, to = ?next, "reset");
        session.phase = next;
        session.last_error = None;
        Ok(next)
    }

    /// Parse and bind a delegation, replacing any previously bound one.
    pub async fn load_delegation(&self, clients: &Clients, serialized: &str) -> Result<LocationRef> {
        let _guard = self.acquire()?;

        {
            let mut session = self.lock();
            if session.phase.on(Event::DelegationBound).is_none() {
                return Err(WorkflowError::NotReady(format!(
                    "cannot load a delegation in {:?}",
                    session.phase
                )));
            }
            session.proof = None;
            session.location = None;
        }

        match Self::parse_and_bind(clients, serialized).await {
            Ok((proof, location)) => {
                let mut session = self.lock();
                let next = session.phase.on(Event::DelegationBound).unwrap_or(session.phase);
                debug!(workflow = self.name, from = ?session.phase, to = ?next, "transition");
                session.phase = next;
                session.proof = Some(Arc::new(proof));
                session.location = Some(location);
                session.last_error = None;
                Ok(location)
            }
            Err(err) if !err.kind().transitions() => Err(err),
            Err(err) => {
                warn!(workflow = self.name, kind = %err.kind(), error = %err, "delegation rejected");
                let mut session = self.lock();
                let next = session
                    .phase
                    .on(Event::DelegationRejected(err.kind()))
                    .unwrap_or(session.phase);
                session.phase = next;
                session.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn parse_and_bind(
        clients: &Clients,
        serialized: &str,
    ) -> Result<(DelegationProof, LocationRef)> {
        let proof = DelegationLoader::parse(serialized)?;
        let storage = clients
            .storage()
            .await
            .map_err(|e| WorkflowError::StorageUnreachable(e.to_string()))?;
        let location = DelegationLoader::bind(&proof, storage.as_ref()).await?;
        Ok((proof, location))
    }

    fn apply(&self, event: Event) {
        let mut session = self.lock();
        match session.phase.on(event) {
            Some(next) => {
                debug!(workflow = self.name, from = ?session.phase, to = ?next, "transition");
                session.phase = next;
            }
            None => {
                warn!(workflow = self.name, phase = ?session.phase, ?event, "event ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_KINDS: [ErrorKind; 3] = [
        ErrorKind::MalformedDelegation,
        ErrorKind::UnauthorizedIdentity,
        ErrorKind::UploadTransportError,
    ];

    fn upload_phases() -> Vec<UploadPhase> {
        let mut phases = vec![
            UploadPhase::AwaitingDelegation,
            UploadPhase::DelegationBound,
            UploadPhase::Uploading,
            UploadPhase::Completed,
        ];
        phases.extend(ALL_KINDS.iter().map(|k| UploadPhase::Failed(*k)));
        phases
    }

    #[test]
    fn test_upload_happy_path() {
        let phase = UploadPhase::INITIAL;
        let phase = phase.on(Event::DelegationBound).unwrap();
        assert_eq!(phase, UploadPhase::DelegationBound);
        let phase = phase.on(Event::Started).unwrap();
        assert_eq!(phase, UploadPhase::Uploading);
        let phase = phase.on(Event::Succeeded).unwrap();
        assert_eq!(phase, UploadPhase::Completed);
        let phase = phase.on(Event::Reset { proof_bound: true }).unwrap();
        assert_eq!(phase, UploadPhase::DelegationBound);
    }

    #[test]
    fn test_uploading_only_finishes() {
        let uploading = UploadPhase::Uploading;
        assert_eq!(uploading.on(Event::DelegationBound), None);
        assert_eq!(uploading.on(Event::Started), None);
        assert_eq!(uploading.on(Event::Reset { proof_bound: true }), None);
        assert_eq!(
            uploading.on(Event::OperationFailed(ErrorKind::EncryptionError)),
            Some(UploadPhase::Failed(ErrorKind::EncryptionError))
        );
    }

    #[test]
    fn test_completed_needs_reset_before_next_upload() {
        assert_eq!(UploadPhase::Completed.on(Event::Started), None);
        assert_eq!(DownloadPhase::Completed.on(Event::Started), Some(DownloadPhase::Decrypting));
    }

    #[test]
    fn test_failed_is_reenterable() {
        for kind in ALL_KINDS {
            let failed = UploadPhase::Failed(kind);
            assert_eq!(failed.on(Event::DelegationBound), Some(UploadPhase::DelegationBound));
            assert_eq!(failed.on(Event::Started), Some(UploadPhase::Uploading));
            assert_eq!(
                failed.on(Event::Reset { proof_bound: false }),
                Some(UploadPhase::AwaitingDelegation)
            );
        }
    }

    #[test]
    fn test_completion_only_from_active() {
        for phase in upload_phases() {
            if phase != UploadPhase::Uploading {
                assert_eq!(phase.on(Event::Succeeded), None, "{:?}", phase);
            }
        }
    }

    #[test]
    fn test_download_identity_retry() {
        let phase = DownloadPhase::DelegationBound.on(Event::Started).unwrap();
        let phase = phase
            .on(Event::OperationFailed(ErrorKind::UnauthorizedIdentity))
            .unwrap();
        assert_eq!(phase, DownloadPhase::Failed(ErrorKind::UnauthorizedIdentity));
        assert_eq!(phase.on(Event::Started), Some(DownloadPhase::Decrypting));
    }

    #[test]
    fn test_busy_flag_released_on_drop() {
        let flag = BusyFlag::default();
        {
            let _guard = flag.try_acquire().unwrap();
            assert!(flag.is_busy());
            assert!(flag.try_acquire().is_none());
        }
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_start_without_binding_is_not_ready() {
        let cell: SessionCell<UploadPhase> = SessionCell::new("upload");
        assert!(matches!(cell.start(), Err(WorkflowError::NotReady(_))));
        assert_eq!(cell.phase(), UploadPhase::AwaitingDelegation);
        assert!(cell.last_error().is_none());
    }

    #[test]
    fn test_fail_records_error() {
        let cell: SessionCell<DownloadPhase> = SessionCell::new("download");
        {
            let mut session = cell.lock();
            session.phase = DownloadPhase::Decrypting;
        }
        let err = cell.fail(WorkflowError::ObjectNotFound("bafy".into()));
        assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
        assert_eq!(cell.phase(), DownloadPhase::Failed(ErrorKind::ObjectNotFound));
        assert_eq!(cell.last_error(), Some(err));
    }

    fn event() -> impl Strategy<Value = Event> {
        let kind = prop_oneof![
            Just(ErrorKind::EmptyInput),
            Just(ErrorKind::StorageUnreachable),
            Just(ErrorKind::AuthenticationTagMismatch),
        ];
        prop_oneof![
            Just(Event::DelegationBound),
            kind.clone().prop_map(Event::DelegationRejected),
            Just(Event::Started),
            Just(Event::Succeeded),
            kind.prop_map(Event::OperationFailed),
            any::<bool>().prop_map(|proof_bound| Event::Reset { proof_bound }),
        ]
    }

    proptest! {
        #[test]
        fn prop_completed_only_after_active(events in prop::collection::vec(event(), 0..64)) {
            let mut upload = UploadPhase::INITIAL;
            let mut download = DownloadPhase::INITIAL;
            for event in events {
                if let Some(next) = upload.on(event) {
                    if next == UploadPhase::Completed {
                        prop_assert_eq!(upload, UploadPhase::Uploading);
                    }
                    upload = next;
                }
                if let Some(next) = download.on(event) {
                    if next == DownloadPhase::Completed {
                        prop_assert_eq!(download, DownloadPhase::Decrypting);
                    }
                    download = next;
                }
            }
        }
    }

    #[test]
    fn test_fail_ignores_non_transitioning_kinds() {
        let cell: SessionCell<UploadPhase> = SessionCell::new("upload");
        {
            let mut session = cell.lock();
            session.phase = UploadPhase::Uploading;
        }
        let err = cell.fail(WorkflowError::NotReady("not now".into()));
        assert_eq!(err.kind(), ErrorKind::NotReady);
        cell.fail(WorkflowError::OperationInProgress("busy".into()));

        assert_eq!(cell.phase(), UploadPhase::Uploading);
        assert!(cell.last_error().is_none());
    }

    #[test]
    fn test_reset_rejected_while_busy() {
        let cell: SessionCell<UploadPhase> = SessionCell::new("upload");
        let _guard = cell.acquire().unwrap();
        assert!(matches!(cell.reset(), Err(WorkflowError::OperationInProgress(_))));
    }
}

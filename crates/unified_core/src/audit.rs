//! Append-only audit log for global registry mutations.
//!
//! Every mutation of the logger registry and the service container records
//! an [`AuditEvent`] here, with the source location of the caller, so
//! operators can reconstruct who touched shared state and when.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::source_location::SourceLocation;

/// Registry mutation kinds covered by the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RegisterLogger,
    UnregisterLogger,
    SetDefaultLogger,
    RegisterFactory,
    SetDefaultFactory,
    ClearLoggers,
    FreezeLoggerRegistry,
    RegisterService,
    UnregisterService,
    ClearServices,
    FreezeServiceContainer,
    DisableAuditLog,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RegisterLogger => "register_logger",
            AuditAction::UnregisterLogger => "unregister_logger",
            AuditAction::SetDefaultLogger => "set_default_logger",
            AuditAction::RegisterFactory => "register_factory",
            AuditAction::SetDefaultFactory => "set_default_factory",
            AuditAction::ClearLoggers => "clear_loggers",
            AuditAction::FreezeLoggerRegistry => "freeze_logger_registry",
            AuditAction::RegisterService => "register_service",
            AuditAction::UnregisterService => "unregister_service",
            AuditAction::ClearServices => "clear_services",
            AuditAction::FreezeServiceContainer => "freeze_service_container",
            AuditAction::DisableAuditLog => "disable_audit_log",
        }
    }
}

/// One audited registry mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    /// Service or logger name; empty for clear/freeze operations.
    pub target_name: String,
    pub location: SourceLocation,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// Empty on success.
    pub error_message: String,
}

impl AuditEvent {
    /// Successful mutation, stamped with the caller's location.
    #[track_caller]
    pub fn new(action: AuditAction, target_name: impl Into<String>) -> Self {
        Self {
            action,
            target_name: target_name.into(),
            location: SourceLocation::caller(),
            timestamp: Utc::now(),
            success: true,
            error_message: String::new(),
        }
    }

    /// Failed mutation, stamped with the caller's location.
    #[track_caller]
    pub fn failed(
        action: AuditAction,
        target_name: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            action,
            target_name: target_name.into(),
            location: SourceLocation::caller(),
            timestamp: Utc::now(),
            success: false,
            error_message: error_message.into(),
        }
    }
}

static EVENTS: Lazy<Mutex<Vec<AuditEvent>>> = Lazy::new(|| Mutex::new(Vec::new()));
static ENABLED: AtomicBool = AtomicBool::new(true);

/// Process-wide, thread-safe registry audit log. Append-only except for
/// [`AuditLog::clear`].
pub struct AuditLog;

impl AuditLog {
    /// Append an event. No-op while logging is disabled.
    pub fn log_event(event: AuditEvent) {
        if !ENABLED.load(Ordering::Acquire) {
            return;
        }
        if let Ok(mut events) = EVENTS.lock() {
            events.push(event);
        }
    }

    /// Snapshot of all events in insertion order.
    pub fn events() -> Vec<AuditEvent> {
        EVENTS.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Snapshot of events matching one action kind.
    pub fn events_by_action(action: AuditAction) -> Vec<AuditEvent> {
        Self::events()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }

    /// Snapshot of events inside an inclusive time range.
    pub fn events_in_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<AuditEvent> {
        Self::events()
            .into_iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .collect()
    }

    pub fn event_count() -> usize {
        EVENTS.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_enabled() -> bool {
        ENABLED.load(Ordering::Acquire)
    }

    /// Enable or disable audit logging. Disabling is security-sensitive, so
    /// the transition itself is recorded before the flag flips.
    #[track_caller]
    pub fn set_enabled(enabled: bool) {
        if !enabled && ENABLED.load(Ordering::Acquire) {
            tracing::warn!("audit logging disabled");
            Self::log_event(AuditEvent::new(
                AuditAction::DisableAuditLog,
                "audit_logging_disabled",
            ));
        }
        ENABLED.store(enabled, Ordering::Release);
    }

    /// Remove all events. Destructive; intended for tests and controlled
    /// resets.
    pub fn clear() {
        if let Ok(mut events) = EVENTS.lock() {
            events.clear();
        }
    }
}

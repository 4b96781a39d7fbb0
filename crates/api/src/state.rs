use ledger_watch_domain::services::TelemetryGuard;
use ledger_watch_monitor::MonitorHandle;

#[derive(Clone)]
pub struct AppState {
    monitor: MonitorHandle,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(monitor: MonitorHandle, telemetry: TelemetryGuard) -> Self {
        Self { monitor, telemetry }
    }

    pub fn monitor(&self) -> &MonitorHandle {
        &self.monitor
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}

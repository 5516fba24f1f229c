pub const CONFIG_PARSE_ERROR: &str = "Failed to parse YAML";

pub fn config_loaded(user: &str, reviewers: usize) -> String {
    format!("Loaded configuration for user: {user} ({reviewers} reviewers)")
}

pub const LOGIN_SUCCESS: &str = "Logged in successfully!";

pub fn set_display_name_fail(err: &str) -> String {
    format!("Failed to set display name: {err}")
}

pub const SYNC_LOOP_START: &str = "Starting sync loop...";
pub const SHUTDOWN: &str = "Shutting down...";

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}

pub fn join_invite_fail(err: &str) -> String {
    format!("Failed to join room after invite: {err}")
}

pub fn reviewer_delivery_failed(reviewer: &str, err: &str) -> String {
    format!("Failed to notify reviewer {reviewer}: {err}")
}

pub fn copy_edit_failed(room: &str, err: &str) -> String {
    format!("Failed to remove actions from copy in {room}: {err}")
}

pub fn applicant_delivery_failed(applicant: &str, err: &str) -> String {
    format!("Failed to message applicant {applicant}: {err}")
}

pub fn conflict(attempt: u32, max: u32, cooldown: u64, err: &str) -> String {
    format!("Connection conflict ({attempt}/{max}): {err}. Cooling down for {cooldown}s")
}

pub fn pump_failed(attempt: u32, max: u32, err: &str) -> String {
    format!("Event pump failed ({attempt}/{max}): {err}")
}

pub fn restart_budget_exhausted(max: u32) -> String {
    format!("Restart budget of {max} exhausted, giving up")
}

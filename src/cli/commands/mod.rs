mod queue;
mod refresh;
mod sessions;
mod sweep;

pub use queue::cmd_queue_status;
pub use refresh::cmd_refresh_user;
pub use sessions::cmd_reset_sessions;
pub use sweep::cmd_sweep;

use crate::services::MaintenanceRun;

fn print_run(run: &MaintenanceRun) {
    println!("{:-<70}", "");
    println!("  Checked:     {}", run.total_checked);
    println!("  Available:   {}", run.available_count);
    println!("  Unavailable: {}", run.unavailable_count);
    println!("  Deactivated: {}", run.deactivated_count);
    println!("  Failed:      {}", run.failed_checks);
}

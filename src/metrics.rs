//! Host metrics snapshot for the live metrics view.

use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};

/// Render a CPU / memory / swap / disk summary.
///
/// CPU usage needs two samples, so this sleeps for sysinfo's minimum
/// sampling interval between refreshes.
pub async fn snapshot() -> String {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let cpu = sys.global_cpu_usage();
    let mem_used = sys.used_memory();
    let mem_total = sys.total_memory();
    let swap_used = sys.used_swap();
    let swap_total = sys.total_swap();

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"));
    let (disk_used, disk_total) = match root {
        Some(d) => (d.total_space() - d.available_space(), d.total_space()),
        None => {
            // No "/" mount (e.g. containers); fall back to the sum of all disks.
            let total: u64 = disks.list().iter().map(|d| d.total_space()).sum();
            let avail: u64 = disks.list().iter().map(|d| d.available_space()).sum();
            (total.saturating_sub(avail), total)
        }
    };

    format!(
        "CPU Usage: {cpu:.1}%\n\
         Memory Usage: {:.1}% ({:.2} GB / {:.2} GB)\n\
         Swap Usage: {:.1}% ({:.2} GB / {:.2} GB)\n\
         Disk Usage: {:.1}% ({:.2} GB / {:.2} GB)",
        percent(mem_used, mem_total),
        gb(mem_used),
        gb(mem_total),
        percent(swap_used, swap_total),
        gb(swap_used),
        gb(swap_total),
        percent(disk_used, disk_total),
        gb(disk_used),
        gb(disk_total),
    )
}

fn gb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0 / 1024.0
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

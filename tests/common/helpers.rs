use std::thread;
use std::time::{Duration, Instant};

use agriflyer::{Plant, SimulationSnapshot};

/// Poll `f` until it yields a value or `timeout` passes.
pub fn wait_for<T>(timeout: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(value) = f() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

/// Index of the plant closest to the field centre
pub fn central_plant(snapshot: &SimulationSnapshot) -> &Plant {
    snapshot
        .plants
        .iter()
        .min_by(|a, b| {
            let da = a.position.x.hypot(a.position.z);
            let db = b.position.x.hypot(b.position.z);
            da.total_cmp(&db)
        })
        .expect("field has plants")
}

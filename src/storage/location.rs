use std::sync::Arc;

use crate::clock::Clock;

/// Chooses the sub-directory new uploads are placed in.
pub trait UploadLocation: Send + Sync {
    fn location(&self) -> String;
}

/// One directory per day: `YYYY/MM/DD`.
pub struct DailyRotate {
    clock: Arc<dyn Clock>,
}

impl DailyRotate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl UploadLocation for DailyRotate {
    fn location(&self) -> String {
        self.clock.now().format("%Y/%m/%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn daily_rotate_pads_month_and_day() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2022, 1, 9, 23, 59, 59).unwrap());
        let location = DailyRotate::new(Arc::new(clock));
        assert_eq!(location.location(), "2022/01/09");
    }
}

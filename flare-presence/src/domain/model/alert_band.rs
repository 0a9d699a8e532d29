/// 在线时长提醒档位
///
/// 第 `level` 档覆盖 `[level * alert_minutes, (level + 1) * alert_minutes)` 分钟，
/// 以秒为单位存储，左闭右开。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertBand {
    pub level: u32,
    pub low_seconds: i64,
    pub high_seconds: i64,
}

impl AlertBand {
    pub fn new(level: u32, alert_minutes: i64) -> Self {
        let step = alert_minutes * 60;
        Self {
            level,
            low_seconds: i64::from(level) * step,
            high_seconds: (i64::from(level) + 1) * step,
        }
    }

    /// 生成 1..=levels 的全部档位
    pub fn all(levels: u32, alert_minutes: i64) -> Vec<Self> {
        (1..=levels)
            .map(|level| Self::new(level, alert_minutes))
            .collect()
    }

    pub fn contains(&self, seconds: i64) -> bool {
        seconds >= self.low_seconds && seconds < self.high_seconds
    }

    /// 该档位对应的已在线分钟数
    pub fn elapsed_minutes(&self) -> i64 {
        self.low_seconds / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries_are_half_open() {
        let bands = AlertBand::all(3, 5);
        assert_eq!(bands.len(), 3);

        let level1 = bands[0];
        assert_eq!((level1.low_seconds, level1.high_seconds), (300, 600));
        assert!(level1.contains(300));
        assert!(!level1.contains(600));
        assert!(bands[1].contains(600));
        assert!(!bands[2].contains(1200));
        assert_eq!(bands[2].elapsed_minutes(), 15);
    }
}

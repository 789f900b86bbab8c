//! Desired-but-not-yet-applied session settings.

use sensorlink_types::{ControlValue, Method};

/// One configurable session property with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    StandbyOverride(bool),
    Interval(i32),
    BufferInterval(u32),
    BufferSize(u32),
    Downsampling(bool),
}

impl Setting {
    /// Remote method applying this setting.
    pub fn method(self) -> Method {
        match self {
            Self::StandbyOverride(_) => Method::SetStandbyOverride,
            Self::Interval(_) => Method::SetInterval,
            Self::BufferInterval(_) => Method::SetBufferInterval,
            Self::BufferSize(_) => Method::SetBufferSize,
            Self::Downsampling(_) => Method::SetDownsampling,
        }
    }

    pub fn value(self) -> ControlValue {
        match self {
            Self::StandbyOverride(v) | Self::Downsampling(v) => ControlValue::Bool(v),
            Self::Interval(v) => ControlValue::Int(v),
            Self::BufferInterval(v) | Self::BufferSize(v) => ControlValue::UInt(v),
        }
    }
}

/// Cached session settings.
///
/// A property only holds a value once it has been set; unset properties
/// read as the service defaults and are left out of the replay, so a
/// start only re-applies what the caller actually asked for. Values
/// survive stop/start cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigCache {
    interval: Option<i32>,
    buffer_interval: Option<u32>,
    buffer_size: Option<u32>,
    standby_override: Option<bool>,
    downsampling: Option<bool>,
}

impl ConfigCache {
    pub const DEFAULT_INTERVAL: i32 = 0;
    pub const DEFAULT_BUFFER_INTERVAL: u32 = 0;
    pub const DEFAULT_BUFFER_SIZE: u32 = 1;
    pub const DEFAULT_STANDBY_OVERRIDE: bool = false;
    pub const DEFAULT_DOWNSAMPLING: bool = true;

    pub fn store(&mut self, setting: Setting) {
        match setting {
            Setting::StandbyOverride(v) => self.standby_override = Some(v),
            Setting::Interval(v) => self.interval = Some(v),
            Setting::BufferInterval(v) => self.buffer_interval = Some(v),
            Setting::BufferSize(v) => self.buffer_size = Some(v),
            Setting::Downsampling(v) => self.downsampling = Some(v),
        }
    }

    pub fn interval(&self) -> i32 {
        self.interval.unwrap_or(Self::DEFAULT_INTERVAL)
    }

    pub fn buffer_interval(&self) -> u32 {
        self.buffer_interval
            .unwrap_or(Self::DEFAULT_BUFFER_INTERVAL)
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size.unwrap_or(Self::DEFAULT_BUFFER_SIZE)
    }

    pub fn standby_override(&self) -> bool {
        self.standby_override
            .unwrap_or(Self::DEFAULT_STANDBY_OVERRIDE)
    }

    pub fn downsampling(&self) -> bool {
        self.downsampling.unwrap_or(Self::DEFAULT_DOWNSAMPLING)
    }

    /// Settings to re-apply on start, in the fixed replay order.
    pub fn replay(&self) -> Vec<Setting> {
        [
            self.standby_override.map(Setting::StandbyOverride),
            self.interval.map(Setting::Interval),
            self.buffer_interval.map(Setting::BufferInterval),
            self.buffer_size.map(Setting::BufferSize),
            self.downsampling.map(Setting::Downsampling),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_properties_read_as_defaults() {
        let cache = ConfigCache::default();
        assert_eq!(cache.interval(), 0);
        assert_eq!(cache.buffer_interval(), 0);
        assert_eq!(cache.buffer_size(), 1);
        assert!(!cache.standby_override());
        assert!(cache.downsampling());
        assert!(cache.replay().is_empty());
    }

    #[test]
    fn replay_keeps_fixed_order_and_last_value() {
        let mut cache = ConfigCache::default();
        cache.store(Setting::Downsampling(false));
        cache.store(Setting::BufferSize(4));
        cache.store(Setting::Interval(50));
        cache.store(Setting::Interval(100));
        cache.store(Setting::StandbyOverride(true));

        assert_eq!(
            cache.replay(),
            vec![
                Setting::StandbyOverride(true),
                Setting::Interval(100),
                Setting::BufferSize(4),
                Setting::Downsampling(false),
            ]
        );
    }

    #[test]
    fn setting_maps_to_method_and_value() {
        assert_eq!(Setting::BufferInterval(30).method(), Method::SetBufferInterval);
        assert_eq!(Setting::BufferInterval(30).value(), ControlValue::UInt(30));
        assert_eq!(Setting::Interval(-1).value(), ControlValue::Int(-1));
    }
}

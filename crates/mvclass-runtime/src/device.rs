/*!
Compute device selection.
*/

/// What the caller asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Pick the best device the backend can execute on.
    #[default]
    Auto,
    Cpu,
}

/// The device a [`ModelRuntime`](crate::ModelRuntime) actually runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
}

impl DevicePreference {
    /// Resolve the preference against what the backend supports.
    ///
    /// The tract backend executes on the host CPU only.
    pub fn resolve(self) -> Device {
        let device = match self {
            DevicePreference::Auto | DevicePreference::Cpu => Device::Cpu,
        };

        log::info!("device preference {} resolved to {}", self, device);
        device
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            _ => Err(format!("unknown device: {}", s)),
        }
    }
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePreference::Auto => f.pad("auto"),
            DevicePreference::Cpu => f.pad("cpu"),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => f.pad("cpu"),
        }
    }
}

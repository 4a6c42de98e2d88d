use crate::error::ProfileError;
use crate::profile::SignalProfile;
use crate::replay::ReplayOptions;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSelection {
    Pulse,       // fingertip camera pulse (default)
    Respiration, // microphone breathing envelope
    Thermal,     // thermistor contact trace
}

impl ProfileSelection {
    pub fn profile(self) -> SignalProfile {
        match self {
            ProfileSelection::Pulse => SignalProfile::pulse(),
            ProfileSelection::Respiration => SignalProfile::respiration(),
            ProfileSelection::Thermal => SignalProfile::thermal(),
        }
    }
}

impl FromStr for ProfileSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pulse" | "hr" => Ok(ProfileSelection::Pulse),
            "respiration" | "br" => Ok(ProfileSelection::Respiration),
            "thermal" | "temp" => Ok(ProfileSelection::Thermal),
            _ => Err(format!(
                "Invalid profile: {}. Use pulse (default), respiration or thermal",
                s
            )),
        }
    }
}

/// Replay recorded sensor traces through a measurement session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Trace file (.csv or .json) or a directory of traces
    #[arg(help = "Trace file (.csv or .json) or a directory of traces")]
    pub input_path: PathBuf,

    /// Signal profile to run (pulse, respiration, thermal)
    #[arg(long, default_value = "pulse", env = "VITAL_TRACE_PROFILE")]
    pub profile: ProfileSelection,

    /// JSON profile file, overrides --profile
    #[arg(long)]
    pub profile_file: Option<PathBuf>,

    /// Log live estimates while replaying
    #[arg(long)]
    pub live: bool,

    /// Stop the replay at this offset and force-end the session
    #[arg(long)]
    pub force_end_ms: Option<u32>,

    /// CSV report path (e.g. /path/to/output/results.csv)
    #[arg(long)]
    pub csv_output: Option<String>,

    /// JSON report path
    #[arg(long)]
    pub json_output: Option<String>,
}

impl Args {
    pub fn resolve_profile(&self) -> Result<SignalProfile, ProfileError> {
        match &self.profile_file {
            Some(path) => SignalProfile::from_json_file(path),
            None => Ok(self.profile.profile()),
        }
    }

    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            live: self.live,
            force_end_ms: self.force_end_ms,
        }
    }
}

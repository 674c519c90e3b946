/// Log tag definitions
///
/// Each subsystem logs under its own tag so output can be scanned and
/// debug gating can be applied per module.
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Hub,
    Store,
    Webserver,
}

impl LogTag {
    /// Plain string (file output, comparisons)
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Hub => "HUB",
            LogTag::Store => "STORE",
            LogTag::Webserver => "WEBSERVER",
        }
    }

    /// Key used for --debug-<key> flag matching
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Hub => "hub",
            LogTag::Store => "store",
            LogTag::Webserver => "webserver",
        }
    }

    /// Colored representation for console output
    pub fn to_colored_string(&self) -> String {
        match self {
            LogTag::System => self.to_plain_string().green().bold().to_string(),
            LogTag::Config => self.to_plain_string().cyan().bold().to_string(),
            LogTag::Hub => self.to_plain_string().magenta().bold().to_string(),
            LogTag::Store => self.to_plain_string().bright_blue().bold().to_string(),
            LogTag::Webserver => self.to_plain_string().yellow().bold().to_string(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}

// src/config.rs
//
// Session configuration: port, baud, theme, the 40 quick-send slots and the
// repeat settings. This is also the on-disk profile document.

use serde::{Deserialize, Serialize, Serializer};

/// Number of quick-send command slots in every profile.
pub const COMMAND_SLOTS: usize = 40;

/// Port name that selects the virtual (no hardware) transport.
pub const VIRTUAL_PORT: &str = "VIRTUAL";

pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_REPEAT_INTERVAL_SECS: f64 = 1.0;

// ============================================================================
// Themes
// ============================================================================

/// Named foreground/background colour pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Dark,
    Amber,
    Blue,
    WhiteOnBlack,
    WhiteOnBlue,
}

/// Colours for one theme, as CSS-style hex strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeColours {
    pub background: &'static str,
    pub foreground: &'static str,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Dark,
        Theme::Amber,
        Theme::Blue,
        Theme::WhiteOnBlack,
        Theme::WhiteOnBlue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Amber => "amber",
            Theme::Blue => "blue",
            Theme::WhiteOnBlack => "white_on_black",
            Theme::WhiteOnBlue => "white_on_blue",
        }
    }

    /// Look up a theme by name. Unknown names give `None`; callers that must
    /// always end up with a theme use [`Theme::from_name_or_default`].
    pub fn from_name(name: &str) -> Option<Theme> {
        Theme::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn from_name_or_default(name: &str) -> Theme {
        Theme::from_name(name).unwrap_or_default()
    }

    pub fn colours(&self) -> ThemeColours {
        match self {
            Theme::Dark => ThemeColours { background: "#111", foreground: "#00FFAA" },
            Theme::Amber => ThemeColours { background: "#1b1200", foreground: "#FFB000" },
            Theme::Blue => ThemeColours { background: "#0b1320", foreground: "#7FDBFF" },
            Theme::WhiteOnBlack => ThemeColours { background: "#000", foreground: "#FFF" },
            Theme::WhiteOnBlue => ThemeColours { background: "#002b55", foreground: "#FFF" },
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Theme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigDocument")]
pub struct Config {
    pub port: String,
    pub baud: u32,
    pub theme: Theme,
    pub commands: Vec<String>,
    #[serde(rename = "repeatIntervalSeconds")]
    pub repeat_interval_secs: f64,
    #[serde(rename = "repeatCount")]
    pub repeat_count: u32,
}

/// Profile document as found on disk. Every field is optional, and older
/// files may carry `repeat_sec`/`repeat_cnt` next to (or instead of) the
/// current repeat keys.
#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    port: Option<String>,
    #[serde(default)]
    baud: Option<u32>,
    #[serde(default)]
    theme: Option<serde_json::Value>,
    #[serde(default)]
    commands: Option<Vec<Option<String>>>,
    #[serde(rename = "repeatIntervalSeconds", default)]
    repeat_interval_secs: Option<f64>,
    #[serde(default)]
    repeat_sec: Option<f64>,
    #[serde(rename = "repeatCount", default)]
    repeat_count: Option<u32>,
    #[serde(default)]
    repeat_cnt: Option<u32>,
}

impl From<ConfigDocument> for Config {
    fn from(doc: ConfigDocument) -> Self {
        // Anything but a known theme name falls back to the default theme
        let theme = doc
            .theme
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(Theme::from_name_or_default)
            .unwrap_or_default();

        let mut commands: Vec<String> = doc
            .commands
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        commands.resize(COMMAND_SLOTS, String::new());

        Self {
            port: doc.port.unwrap_or_else(default_port),
            baud: doc.baud.unwrap_or(DEFAULT_BAUD),
            theme,
            commands,
            repeat_interval_secs: doc
                .repeat_interval_secs
                .or(doc.repeat_sec)
                .unwrap_or(DEFAULT_REPEAT_INTERVAL_SECS),
            repeat_count: doc.repeat_count.or(doc.repeat_cnt).unwrap_or(0),
        }
    }
}

fn default_port() -> String {
    VIRTUAL_PORT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: DEFAULT_BAUD,
            theme: Theme::default(),
            commands: vec![String::new(); COMMAND_SLOTS],
            repeat_interval_secs: DEFAULT_REPEAT_INTERVAL_SECS,
            repeat_count: 0,
        }
    }
}

impl Config {
    /// Virtual config with defaults, handy for development without a device.
    pub fn virtual_port() -> Self {
        Self::default()
    }

    /// Physical port config with the remaining fields defaulted.
    pub fn for_port(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
            ..Self::default()
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.port == VIRTUAL_PORT
    }

    /// Saved command at `index`, or `None` when the index is out of range.
    pub fn command(&self, index: usize) -> Option<&str> {
        self.commands.get(index).map(String::as_str)
    }

    /// Overwrite a slot. Slots are never added or removed.
    pub fn set_command(&mut self, index: usize, text: impl Into<String>) -> Result<(), String> {
        let slot = self
            .commands
            .get_mut(index)
            .ok_or_else(|| format!("Command slot {} out of range (0-{})", index, COMMAND_SLOTS - 1))?;
        *slot = text.into();
        Ok(())
    }

    /// Repeat bound, `None` meaning "until stopped".
    pub fn repeat_limit(&self) -> Option<u32> {
        match self.repeat_count {
            0 => None,
            n => Some(n),
        }
    }

    /// Check values that serde accepts but the session cannot use.
    pub fn validate(&self) -> Result<(), String> {
        if self.port.trim().is_empty() {
            return Err("port must not be empty".to_string());
        }
        if self.baud == 0 {
            return Err("baud must be a positive integer".to_string());
        }
        if !self.repeat_interval_secs.is_finite() || self.repeat_interval_secs <= 0.0 {
            return Err(format!(
                "repeatIntervalSeconds must be positive (got {})",
                self.repeat_interval_secs
            ));
        }
        if self.commands.len() != COMMAND_SLOTS {
            return Err(format!(
                "commands must have {} slots (got {})",
                COMMAND_SLOTS,
                self.commands.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.is_virtual());
        assert_eq!(cfg.baud, 115_200);
        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.commands.len(), COMMAND_SLOTS);
        assert!(cfg.commands.iter().all(String::is_empty));
        assert_eq!(cfg.repeat_interval_secs, 1.0);
        assert_eq!(cfg.repeat_count, 0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"port": "/dev/ttyACM0"}"#).unwrap();
        assert_eq!(cfg.port, "/dev/ttyACM0");
        assert_eq!(cfg.baud, DEFAULT_BAUD);
        assert_eq!(cfg.repeat_count, 0);
        assert_eq!(cfg.repeat_limit(), None);
        assert_eq!(cfg.commands.len(), COMMAND_SLOTS);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let cfg: Config = serde_json::from_str(r#"{"theme": "solarized"}"#).unwrap();
        assert_eq!(cfg.theme, Theme::Dark);

        let cfg: Config = serde_json::from_str(r#"{"theme": "amber"}"#).unwrap();
        assert_eq!(cfg.theme, Theme::Amber);

        for raw in [r#"{"theme": null}"#, r#"{"theme": 3}"#, r#"{"theme": ["amber"]}"#] {
            let cfg: Config = serde_json::from_str(raw).unwrap();
            assert_eq!(cfg.theme, Theme::Dark, "{}", raw);
        }
    }

    #[test]
    fn test_commands_normalised_to_slot_count() {
        let cfg: Config = serde_json::from_str(r#"{"commands": ["AT", "", "ATI"]}"#).unwrap();
        assert_eq!(cfg.commands.len(), COMMAND_SLOTS);
        assert_eq!(cfg.command(0), Some("AT"));
        assert_eq!(cfg.command(1), Some(""));
        assert_eq!(cfg.command(2), Some("ATI"));

        let long: Vec<String> = (0..50).map(|i| format!("cmd{}", i)).collect();
        let json = serde_json::json!({ "commands": long });
        let cfg: Config = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.commands.len(), COMMAND_SLOTS);
        assert_eq!(cfg.command(39), Some("cmd39"));

        let cfg: Config = serde_json::from_str(r#"{"commands": null}"#).unwrap();
        assert_eq!(cfg.commands.len(), COMMAND_SLOTS);
    }

    #[test]
    fn test_legacy_repeat_field_names() {
        let cfg: Config = serde_json::from_str(r#"{"repeat_sec": 2.5, "repeat_cnt": 4}"#).unwrap();
        assert_eq!(cfg.repeat_interval_secs, 2.5);
        assert_eq!(cfg.repeat_count, 4);
        assert_eq!(cfg.repeat_limit(), Some(4));
    }

    #[test]
    fn test_current_and_legacy_repeat_keys_together() {
        let cfg: Config = serde_json::from_str(
            r#"{"repeatIntervalSeconds": 1.0, "repeat_sec": 2.0, "repeatCount": 3, "repeat_cnt": 7, "extra": true}"#,
        )
        .unwrap();
        assert_eq!(cfg.repeat_interval_secs, 1.0);
        assert_eq!(cfg.repeat_count, 3);
    }

    #[test]
    fn test_interval_survives_json_exactly() {
        let mut cfg = Config::default();
        cfg.repeat_interval_secs = 3.9430133845633675;
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.repeat_interval_secs.to_bits(), cfg.repeat_interval_secs.to_bits());
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(Config::default()).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["port", "baud", "theme", "commands", "repeatIntervalSeconds", "repeatCount"] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(obj["theme"], "dark");
    }

    #[test]
    fn test_set_command_bounds() {
        let mut cfg = Config::default();
        cfg.set_command(39, "AT+RST").unwrap();
        assert_eq!(cfg.command(39), Some("AT+RST"));
        assert!(cfg.set_command(40, "nope").is_err());
        assert_eq!(cfg.commands.len(), COMMAND_SLOTS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.baud = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.repeat_interval_secs = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.repeat_interval_secs = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_theme_table() {
        assert_eq!(Theme::from_name("white_on_blue"), Some(Theme::WhiteOnBlue));
        assert_eq!(Theme::from_name("nope"), None);
        assert_eq!(Theme::Amber.colours().foreground, "#FFB000");
        for theme in Theme::ALL {
            assert_eq!(Theme::from_name(theme.name()), Some(theme));
        }
    }
}

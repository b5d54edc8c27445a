//! Game configuration loading.
//!
//! Every tunable of a round (tick length, event periods, lab delays and
//! strengths) lives in [`GameConfig`].  All values are optional in the file;
//! anything left out keeps the classic game's constant.
//!
//! The expected YAML structure is:
//! ```yaml
//! game:
//!   tick_ms: 10
//!   contamination_deadline_ms: 10
//!   contamination_period_min: 50    # ticks
//!   contamination_period_max: 300   # ticks
//!   clue_period: 300                # ticks
//!   virus_period: 500               # ticks
//!   vaccine_delay_ms: 2500
//!   medicine_delay_ms: 500
//!   ship_medicine_delay_ms: 500
//!   contamination_strength: 20      # %
//!   virus_spread_strength: 5        # %
//!   vaccine_strength: 3             # %
//!   min_medicine_stock: 4           # optional vaccine gating
//!   render_period_ms: 100
//!   seed: 1234
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_TICK_MS: u64 = 10;
pub const DEFAULT_CONTAMINATION_DEADLINE_MS: u64 = 10;
pub const DEFAULT_CONTAMINATION_PERIOD_MIN: u16 = 50;
pub const DEFAULT_CONTAMINATION_PERIOD_MAX: u16 = 300;
pub const DEFAULT_CLUE_PERIOD: u16 = 300;
pub const DEFAULT_VIRUS_PERIOD: u16 = 500;
pub const DEFAULT_VACCINE_DELAY_MS: u64 = 2_500;
pub const DEFAULT_MEDICINE_DELAY_MS: u64 = 500;
pub const DEFAULT_SHIP_MEDICINE_DELAY_MS: u64 = 500;
pub const DEFAULT_CONTAMINATION_STRENGTH: u8 = 20;
pub const DEFAULT_VIRUS_SPREAD_STRENGTH: u8 = 5;
pub const DEFAULT_VACCINE_STRENGTH: u8 = 3;
pub const DEFAULT_RENDER_PERIOD_MS: u64 = 100;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
struct GameConfigFile {
    #[serde(default)]
    game: GameConfigEntry,
}

/// Fields as they appear in the YAML file.  Every one is optional.
#[derive(Debug, Default, Deserialize)]
struct GameConfigEntry {
    tick_ms: Option<u64>,
    contamination_deadline_ms: Option<u64>,
    contamination_period_min: Option<u16>,
    contamination_period_max: Option<u16>,
    clue_period: Option<u16>,
    virus_period: Option<u16>,
    vaccine_delay_ms: Option<u64>,
    medicine_delay_ms: Option<u64>,
    ship_medicine_delay_ms: Option<u64>,
    contamination_strength: Option<u8>,
    virus_spread_strength: Option<u8>,
    vaccine_strength: Option<u8>,
    min_medicine_stock: Option<u8>,
    render_period_ms: Option<u64>,
    seed: Option<u64>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Tunables for one game round.
///
/// Periods are counted in clock ticks; delays are wall-clock durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Game Clock tick interval.
    pub tick: Duration,
    /// Time the contamination responder has to engage quarantine, measured
    /// from the moment the window opens.
    pub contamination_deadline: Duration,
    /// Inclusive bounds for the randomised contamination countdown.
    pub contamination_period_min: u16,
    pub contamination_period_max: u16,
    pub clue_period: u16,
    pub virus_period: u16,
    /// Non-yielding lab hold for a vaccine mission.
    pub vaccine_delay: Duration,
    /// Non-yielding lab hold for a medicine mission.
    pub medicine_delay: Duration,
    /// Non-yielding delay between a medicine mission and the pill landing in
    /// stock.  Runs outside the lab.
    pub ship_medicine_delay: Duration,
    pub contamination_strength: u8,
    pub virus_spread_strength: u8,
    pub vaccine_strength: u8,
    /// Vaccine work is skipped while medicine stock is below this level.
    pub min_medicine_stock: Option<u8>,
    /// How often the presentation layer renders counters.
    pub render_period: Duration,
    /// Seed for reproducible rounds; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            contamination_deadline: Duration::from_millis(DEFAULT_CONTAMINATION_DEADLINE_MS),
            contamination_period_min: DEFAULT_CONTAMINATION_PERIOD_MIN,
            contamination_period_max: DEFAULT_CONTAMINATION_PERIOD_MAX,
            clue_period: DEFAULT_CLUE_PERIOD,
            virus_period: DEFAULT_VIRUS_PERIOD,
            vaccine_delay: Duration::from_millis(DEFAULT_VACCINE_DELAY_MS),
            medicine_delay: Duration::from_millis(DEFAULT_MEDICINE_DELAY_MS),
            ship_medicine_delay: Duration::from_millis(DEFAULT_SHIP_MEDICINE_DELAY_MS),
            contamination_strength: DEFAULT_CONTAMINATION_STRENGTH,
            virus_spread_strength: DEFAULT_VIRUS_SPREAD_STRENGTH,
            vaccine_strength: DEFAULT_VACCINE_STRENGTH,
            min_medicine_stock: None,
            render_period: Duration::from_millis(DEFAULT_RENDER_PERIOD_MS),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parses the YAML file at `path`, applying defaults for absent keys.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the YAML is
    /// structurally invalid, or if [`validate`](Self::validate) rejects it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading game configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parses a YAML document.  An empty document yields the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: GameConfigFile = if content.trim().is_empty() {
            GameConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };

        let e = file.game;
        let d = Self::default();
        let ms = Duration::from_millis;
        let cfg = Self {
            tick: e.tick_ms.map_or(d.tick, ms),
            contamination_deadline: e
                .contamination_deadline_ms
                .map_or(d.contamination_deadline, ms),
            contamination_period_min: e
                .contamination_period_min
                .unwrap_or(d.contamination_period_min),
            contamination_period_max: e
                .contamination_period_max
                .unwrap_or(d.contamination_period_max),
            clue_period: e.clue_period.unwrap_or(d.clue_period),
            virus_period: e.virus_period.unwrap_or(d.virus_period),
            vaccine_delay: e.vaccine_delay_ms.map_or(d.vaccine_delay, ms),
            medicine_delay: e.medicine_delay_ms.map_or(d.medicine_delay, ms),
            ship_medicine_delay: e.ship_medicine_delay_ms.map_or(d.ship_medicine_delay, ms),
            contamination_strength: e
                .contamination_strength
                .unwrap_or(d.contamination_strength),
            virus_spread_strength: e.virus_spread_strength.unwrap_or(d.virus_spread_strength),
            vaccine_strength: e.vaccine_strength.unwrap_or(d.vaccine_strength),
            min_medicine_stock: e.min_medicine_stock,
            render_period: e.render_period_ms.map_or(d.render_period, ms),
            seed: e.seed,
        };

        cfg.validate()?;

        debug!(
            tick_ms        = cfg.tick.as_millis() as u64,
            deadline_ms    = cfg.contamination_deadline.as_millis() as u64,
            contamination  = ?(cfg.contamination_period_min, cfg.contamination_period_max),
            clue_period    = cfg.clue_period,
            virus_period   = cfg.virus_period,
            "configuration parsed"
        );

        Ok(cfg)
    }

    /// Reject configurations that would stall or break the round.
    pub fn validate(&self) -> Result<()> {
        if self.tick.is_zero() {
            bail!("tick_ms must be at least 1");
        }
        if self.render_period.is_zero() {
            bail!("render_period_ms must be at least 1");
        }
        if self.contamination_period_min == 0 || self.clue_period == 0 || self.virus_period == 0
        {
            bail!("event periods must be at least 1 tick");
        }
        if self.contamination_period_min > self.contamination_period_max {
            bail!(
                "contamination_period_min ({}) exceeds contamination_period_max ({})",
                self.contamination_period_min,
                self.contamination_period_max
            );
        }
        // A window still armed when the next contamination fires swallows it.
        let shortest_gap = self.tick * u32::from(self.contamination_period_min);
        if self.contamination_deadline >= shortest_gap {
            bail!(
                "contamination_deadline_ms ({} ms) must be shorter than the shortest \
                 contamination interval ({} ticks × {} ms)",
                self.contamination_deadline.as_millis(),
                self.contamination_period_min,
                self.tick.as_millis()
            );
        }
        for (name, value) in [
            ("contamination_strength", self.contamination_strength),
            ("virus_spread_strength", self.virus_spread_strength),
            ("vaccine_strength", self.vaccine_strength),
        ] {
            if value > 100 {
                bail!("{name} is a percentage, got {value}");
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_config_matches_classic_constants() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.tick, Duration::from_millis(10));
        assert_eq!(cfg.contamination_deadline, Duration::from_millis(10));
        assert_eq!(cfg.contamination_period_min, 50);
        assert_eq!(cfg.contamination_period_max, 300);
        assert_eq!(cfg.clue_period, 300);
        assert_eq!(cfg.virus_period, 500);
        assert_eq!(cfg.vaccine_delay, Duration::from_millis(2_500));
        assert_eq!(cfg.medicine_delay, Duration::from_millis(500));
        assert_eq!(cfg.contamination_strength, 20);
        assert_eq!(cfg.virus_spread_strength, 5);
        assert_eq!(cfg.vaccine_strength, 3);
        assert_eq!(cfg.min_medicine_stock, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bundled_classic_config_matches_defaults() {
        let cfg = GameConfig::from_yaml_str(include_str!("../../configs/classic.yaml")).unwrap();
        assert_eq!(cfg, GameConfig::default());
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
game:
  tick_ms: 5
  contamination_deadline_ms: 20
  contamination_period_min: 10
  contamination_period_max: 40
  clue_period: 100
  virus_period: 200
  vaccine_delay_ms: 30
  medicine_delay_ms: 7
  ship_medicine_delay_ms: 3
  contamination_strength: 25
  virus_spread_strength: 4
  vaccine_strength: 10
  min_medicine_stock: 2
  render_period_ms: 50
  seed: 99
"#;
        let f = yaml_tempfile(yaml);
        let cfg = GameConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.tick, Duration::from_millis(5));
        assert_eq!(cfg.contamination_deadline, Duration::from_millis(20));
        assert_eq!(cfg.contamination_period_min, 10);
        assert_eq!(cfg.contamination_period_max, 40);
        assert_eq!(cfg.clue_period, 100);
        assert_eq!(cfg.virus_period, 200);
        assert_eq!(cfg.vaccine_delay, Duration::from_millis(30));
        assert_eq!(cfg.medicine_delay, Duration::from_millis(7));
        assert_eq!(cfg.ship_medicine_delay, Duration::from_millis(3));
        assert_eq!(cfg.contamination_strength, 25);
        assert_eq!(cfg.virus_spread_strength, 4);
        assert_eq!(cfg.vaccine_strength, 10);
        assert_eq!(cfg.min_medicine_stock, Some(2));
        assert_eq!(cfg.render_period, Duration::from_millis(50));
        assert_eq!(cfg.seed, Some(99));
    }

    #[test]
    fn absent_fields_keep_defaults() {
        let f = yaml_tempfile("game:\n  vaccine_strength: 7\n");
        let cfg = GameConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.vaccine_strength, 7);
        assert_eq!(
            GameConfig {
                vaccine_strength: 3,
                ..cfg
            },
            GameConfig::default()
        );
    }

    #[test]
    fn empty_file_yields_defaults() {
        let f = yaml_tempfile("");
        assert_eq!(
            GameConfig::load_from_file(f.path()).unwrap(),
            GameConfig::default()
        );
    }

    #[test]
    fn missing_file_returns_error() {
        let result = GameConfig::load_from_file(Path::new("/nonexistent/path/game.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(GameConfig::load_from_file(f.path()).is_err());
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn inverted_contamination_range_is_rejected() {
        let err = GameConfig::from_yaml_str(
            "game:\n  contamination_period_min: 300\n  contamination_period_max: 50\n",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("contamination_period_min"));
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(GameConfig::from_yaml_str("game:\n  tick_ms: 0\n").is_err());
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(GameConfig::from_yaml_str("game:\n  virus_period: 0\n").is_err());
    }

    #[test]
    fn deadline_reaching_next_contamination_is_rejected() {
        // 5 ticks × 10 ms = 50 ms between contaminations at the earliest.
        let err = GameConfig::from_yaml_str(
            "game:\n  contamination_period_min: 5\n  contamination_deadline_ms: 50\n",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("contamination_deadline_ms"));

        let cfg = GameConfig::from_yaml_str(
            "game:\n  contamination_period_min: 5\n  contamination_deadline_ms: 49\n",
        )
        .unwrap();
        assert_eq!(cfg.contamination_deadline, Duration::from_millis(49));
    }

    #[test]
    fn strength_above_hundred_is_rejected() {
        let err = GameConfig::from_yaml_str("game:\n  contamination_strength: 150\n").unwrap_err();
        assert!(format!("{err:#}").contains("contamination_strength"));
    }
}

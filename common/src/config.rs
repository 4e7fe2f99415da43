use std::str::FromStr;

/// Settings for the bot binary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub height: usize,
    pub width: usize,
    pub mines: usize,
    /// Seed for mine placement and guesses. Random when absent.
    pub seed: Option<u64>,
    /// How many games to play back to back.
    pub games: usize,
    /// Pause between moves, to make the game watchable.
    pub delay_ms: u64,
    /// Print the board after every move.
    pub show_board: bool,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LogLevel {
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            height: 8,
            width: 8,
            mines: 8,
            seed: None,
            games: 1,
            delay_ms: 0,
            show_board: true,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Builds a config from `--key=value` style arguments on top of the
    /// defaults. The first element is expected to be the program name.
    ///
    /// ```text
    /// --height=16 --width=30 --mines=99 --seed=42 --games=10 --delay=200
    /// --level=expert --quiet --verbose --trace
    /// ```
    pub fn from_args<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Config::default();

        for arg in args.into_iter().skip(1) {
            let arg = arg.as_ref();
            let (key, value) = match arg.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (arg, None),
            };

            match (key, value) {
                ("--height", Some(v)) => config.height = parse(key, v)?,
                ("--width", Some(v)) => config.width = parse(key, v)?,
                ("--mines", Some(v)) => config.mines = parse(key, v)?,
                ("--seed", Some(v)) => config.seed = Some(parse(key, v)?),
                ("--games", Some(v)) => config.games = parse(key, v)?,
                ("--delay", Some(v)) => config.delay_ms = parse(key, v)?,
                ("--level", Some(v)) => config.apply_level(v)?,
                ("--quiet", None) => {
                    config.show_board = false;
                    config.log_level = LogLevel::Warn;
                }
                ("--verbose", None) => config.log_level = LogLevel::Debug,
                ("--trace", None) => config.log_level = LogLevel::Trace,
                _ => anyhow::bail!("unknown argument: {arg}"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Classic board presets.
    fn apply_level(&mut self, level: &str) -> anyhow::Result<()> {
        let (height, width, mines) = match level {
            "beginner" => (9, 9, 10),
            "intermediate" => (16, 16, 40),
            "expert" => (16, 30, 99),
            other => anyhow::bail!("unknown level: {other}"),
        };
        self.height = height;
        self.width = width;
        self.mines = mines;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.height == 0 || self.width == 0 {
            anyhow::bail!("board dimensions must be positive");
        }
        let Some(area) = self.height.checked_mul(self.width) else {
            anyhow::bail!("a {}x{} board is too large", self.height, self.width);
        };
        if self.mines >= area {
            anyhow::bail!(
                "{} mines do not fit on a {}x{} board",
                self.mines,
                self.height,
                self.width
            );
        }
        if self.games == 0 {
            anyhow::bail!("at least one game must be played");
        }
        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid value for {key}: {value} ({e})"))
}

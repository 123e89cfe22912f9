use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_MUSIC_PATH: &str = "/DATA/Media/Music/";
pub const DEFAULT_ALLOWED_EXTENSIONS: &str = ".mp3,.wav,.flac,.m4a";
pub const DEFAULT_CACHE_MAX_AGE: u64 = 3600;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration
///
/// Loaded once at startup from the environment (and a `.env` file if present),
/// then passed explicitly to the scanner, streamer, and router.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory holding the music library
    pub music_path: PathBuf,
    /// Lowercased extensions with leading dot, e.g. `.flac`
    pub allowed_extensions: Vec<String>,
    /// `max-age` for the `Cache-Control` header on streamed audio, in seconds
    pub cache_max_age: u64,
    pub host: String,
    pub port: u16,
    /// Directory of static player assets served at `/`, if any
    pub public_dir: Option<PathBuf>,
}

impl Config {
    /// Defaults for everything except the media root.
    pub fn new(music_path: PathBuf) -> Self {
        Self {
            music_path,
            allowed_extensions: parse_extensions(DEFAULT_ALLOWED_EXTENSIONS),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_dir: None,
        }
    }

    /// Load configuration from `.env` and the process environment
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("Config: loaded {}", path.display()),
            Err(_) => info!("Config: no .env file found, using process environment"),
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let music_path = lookup("MUSIC_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MUSIC_PATH));

        let allowed_extensions = parse_extensions(
            &lookup("ALLOWED_EXTENSIONS").unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
        );

        let cache_max_age = match lookup("CACHE_CONTROL_MAX_AGE") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(
                    "Config: invalid CACHE_CONTROL_MAX_AGE {:?}, using {}",
                    raw, DEFAULT_CACHE_MAX_AGE
                );
                DEFAULT_CACHE_MAX_AGE
            }),
            None => DEFAULT_CACHE_MAX_AGE,
        };

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Config: invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let public_dir = lookup("PUBLIC_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        info!("Config: music path {}", music_path.display());
        info!("Config: allowed extensions {:?}", allowed_extensions);

        Self {
            music_path,
            allowed_extensions,
            cache_max_age,
            host,
            port,
            public_dir,
        }
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Value for the `Cache-Control` header on audio responses
    pub fn cache_control(&self) -> String {
        format!("max-age={}", self.cache_max_age)
    }
}

/// Split a comma-separated extension list into normalized `.ext` entries.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext != ".")
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.music_path, PathBuf::from("/DATA/Media/Music/"));
        assert_eq!(config.allowed_extensions, vec![".mp3", ".wav", ".flac", ".m4a"]);
        assert_eq!(config.cache_max_age, 3600);
        assert_eq!(config.cache_control(), "max-age=3600");
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.public_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("MUSIC_PATH", "/srv/music"),
            ("ALLOWED_EXTENSIONS", " .MP3, ogg ,, "),
            ("CACHE_CONTROL_MAX_AGE", "60"),
            ("PORT", "8080"),
            ("PUBLIC_DIR", "./public"),
        ]));
        assert_eq!(config.music_path, PathBuf::from("/srv/music"));
        assert_eq!(config.allowed_extensions, vec![".mp3", ".ogg"]);
        assert_eq!(config.cache_max_age, 60);
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_dir, Some(PathBuf::from("./public")));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("CACHE_CONTROL_MAX_AGE", "soon"),
            ("PORT", "99999"),
        ]));
        assert_eq!(config.cache_max_age, DEFAULT_CACHE_MAX_AGE);
        assert_eq!(config.port, DEFAULT_PORT);
    }
}

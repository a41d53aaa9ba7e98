// Well-known system and user locations
use std::path::{Path, PathBuf};

pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn existing_unique(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if dir.exists() && !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// The current user's temp directory (cache cleanup target)
pub fn user_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Temp, download-cache and log directories purged by temp cleanup
pub fn temp_directories() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    #[cfg(windows)]
    {
        for var in ["TEMP", "TMP"] {
            if let Ok(dir) = std::env::var(var) {
                candidates.push(PathBuf::from(dir));
            }
        }
        let windir = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
        let windir = PathBuf::from(windir);
        candidates.push(windir.join("Temp"));
        candidates.push(windir.join("SoftwareDistribution").join("Download"));
        candidates.push(windir.join("Logs"));
    }

    #[cfg(unix)]
    {
        candidates.push(PathBuf::from("/tmp"));
        if let Ok(dir) = std::env::var("TMPDIR") {
            candidates.push(PathBuf::from(dir));
        }
    }

    existing_unique(candidates)
}

/// Recycle bin / trash directories whose contents can be emptied
pub fn recycle_bin_directories() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let candidates = ('C'..='Z')
            .map(|drive| PathBuf::from(format!("{}:\\$Recycle.Bin", drive)))
            .collect();
        existing_unique(candidates)
    }

    #[cfg(not(windows))]
    {
        let home = home_dir();
        existing_unique(vec![
            home.join(".local/share/Trash/files"),
            home.join(".local/share/Trash/info"),
            home.join(".Trash"),
        ])
    }
}

/// Windows prefetch directory; `None` elsewhere
pub fn prefetch_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        let windir = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
        Some(PathBuf::from(windir).join("Prefetch"))
    }

    #[cfg(not(windows))]
    {
        None
    }
}

/// Directories the threat scanner looks at when none are configured
pub fn default_scan_directories() -> Vec<PathBuf> {
    let home = home_dir();
    let mut dirs = vec![
        dirs::download_dir().unwrap_or_else(|| home.join("Downloads")),
        dirs::desktop_dir().unwrap_or_else(|| home.join("Desktop")),
        dirs::document_dir().unwrap_or_else(|| home.join("Documents")),
    ];

    #[cfg(windows)]
    {
        dirs.push(PathBuf::from("C:\\Windows\\Temp"));
        dirs.push(PathBuf::from("C:\\Temp"));
    }

    #[cfg(unix)]
    {
        dirs.push(PathBuf::from("/tmp"));
    }

    dirs
}

pub fn default_quarantine_dir() -> PathBuf {
    home_dir().join("qdesk_quarantine")
}

pub fn default_tasks_file() -> PathBuf {
    home_dir().join("qdesk_tasks.json")
}

/// Browser data locations relative to a home directory
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserArtifacts {
    pub browser: &'static str,
    pub paths: Vec<PathBuf>,
}

/// Chromium-family profile files (history, cookies, cache, form data)
pub fn chromium_artifacts(home: &Path) -> Vec<BrowserArtifacts> {
    #[cfg(windows)]
    let (chrome, edge) = {
        let local = home.join("AppData").join("Local");
        (
            local.join("Google\\Chrome\\User Data\\Default"),
            local.join("Microsoft\\Edge\\User Data\\Default"),
        )
    };

    #[cfg(not(windows))]
    let (chrome, edge) = {
        let config = home.join(".config");
        (
            config.join("google-chrome").join("Default"),
            config.join("microsoft-edge").join("Default"),
        )
    };

    vec![
        BrowserArtifacts {
            browser: "Chrome",
            paths: ["History", "Cookies", "Cache", "Web Data"]
                .iter()
                .map(|f| chrome.join(f))
                .collect(),
        },
        BrowserArtifacts {
            browser: "Edge",
            paths: ["History", "Cookies", "Cache"]
                .iter()
                .map(|f| edge.join(f))
                .collect(),
        },
    ]
}

pub fn firefox_profiles_dir(home: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        home.join("AppData\\Roaming\\Mozilla\\Firefox\\Profiles")
    }

    #[cfg(not(windows))]
    {
        home.join(".mozilla").join("firefox")
    }
}

pub const FIREFOX_ARTIFACTS: &[&str] = &["places.sqlite", "cookies.sqlite", "cache2"];

/// Directories holding "recent documents" shortcuts
pub fn recent_document_dirs(home: &Path) -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let roaming = home.join("AppData").join("Roaming").join("Microsoft");
        vec![roaming.join("Windows\\Recent"), roaming.join("Office\\Recent")]
    }

    #[cfg(not(windows))]
    {
        vec![home.join(".local/share/RecentDocuments")]
    }
}

pub fn jump_list_dir(home: &Path) -> Option<PathBuf> {
    #[cfg(windows)]
    {
        Some(home.join("AppData\\Roaming\\Microsoft\\Windows\\Recent\\AutomaticDestinations"))
    }

    #[cfg(not(windows))]
    {
        let _ = home;
        None
    }
}

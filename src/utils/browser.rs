use std::path::{Path, PathBuf};

/// Binary names looked up on `PATH`, Chrome first
const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "msedge",
];

/// Well-known install locations
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
];

/// Locate a Chromium-family browser
///
/// Order: explicit path, `PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH`, known install
/// locations, then `PATH`. `None` leaves the choice to Playwright.
pub fn find_browser(explicit: Option<&Path>) -> Option<PathBuf> {
    let env = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    resolve(explicit, env, |p| p.exists(), |name| which::which(name).ok())
}

fn resolve<E, W>(explicit: Option<&Path>, env: Option<PathBuf>, exists: E, which: W) -> Option<PathBuf>
where
    E: Fn(&Path) -> bool,
    W: Fn(&str) -> Option<PathBuf>,
{
    if let Some(path) = explicit {
        // An explicit choice is used even if it does not exist yet, so the
        // launch error names it
        return Some(path.to_path_buf());
    }
    if let Some(path) = env {
        return Some(path);
    }
    KNOWN_PATHS
        .iter()
        .map(Path::new)
        .find(|p| exists(p))
        .map(Path::to_path_buf)
        .or_else(|| PATH_NAMES.iter().find_map(|name| which(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        let found = resolve(
            Some(Path::new("/opt/chrome/chrome")),
            Some(PathBuf::from("/env/chrome")),
            |_| true,
            |_| None,
        );
        assert_eq!(found, Some(PathBuf::from("/opt/chrome/chrome")));
    }

    #[test]
    fn test_known_path_before_path_lookup() {
        let found = resolve(
            None,
            None,
            |p| p == Path::new("/usr/bin/chromium"),
            |_| Some(PathBuf::from("/somewhere/google-chrome")),
        );
        assert_eq!(found, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_path_lookup_fallback() {
        let found = resolve(None, None, |_| false, |name| {
            (name == "chromium").then(|| PathBuf::from("/nix/bin/chromium"))
        });
        assert_eq!(found, Some(PathBuf::from("/nix/bin/chromium")));
        assert_eq!(resolve(None, None, |_| false, |_| None), None);
    }
}

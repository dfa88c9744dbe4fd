//! Edge detector tests against a scratch directory standing in for the
//! sysfs GPIO tree.

use piface_spi::{EdgeDetectorOptions, EdgeMode, GpioEdgeDetector};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

struct ScratchGpioRoot {
    root: PathBuf,
}

impl ScratchGpioRoot {
    /// Creates `export`/`unexport` control files and, for each listed
    /// pin, a pre-populated line directory (real sysfs materialises
    /// those on export; a plain directory cannot).
    fn new(test: &str, pins: &[u8]) -> Self {
        let root = std::env::temp_dir().join(format!(
            "piface-edge-{}-{}",
            test,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("export"), "").unwrap();
        fs::write(root.join("unexport"), "").unwrap();
        for pin in pins {
            let line = root.join(format!("gpio{pin}"));
            fs::create_dir_all(&line).unwrap();
            fs::write(line.join("direction"), "").unwrap();
            fs::write(line.join("edge"), "").unwrap();
            fs::write(line.join("value"), "0\n").unwrap();
        }
        Self { root }
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.root.join(name)).unwrap()
    }

    fn options(&self) -> EdgeDetectorOptions {
        EdgeDetectorOptions::default()
            .with_gpio_root(&self.root)
            .with_poll_timeout(Duration::from_millis(20))
    }
}

impl Drop for ScratchGpioRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[test]
fn edge_none_unexports_and_does_not_poll() {
    let scratch = ScratchGpioRoot::new("none", &[]);
    let detector = GpioEdgeDetector::open_with(7, EdgeMode::None, scratch.options()).unwrap();
    assert!(!detector.is_polling());
    assert_eq!(scratch.read("unexport"), "7");
    // No line directory was needed: nothing was exported or opened.
    assert!(!scratch.root.join("gpio7").exists());
}

#[test]
fn armed_detector_configures_the_line() {
    let scratch = ScratchGpioRoot::new("armed", &[25]);
    let detector =
        GpioEdgeDetector::open_with(25, EdgeMode::Falling, scratch.options()).unwrap();
    assert_eq!(detector.pin(), 25);
    assert!(detector.is_polling());
    assert_eq!(scratch.read("export"), "25");
    assert_eq!(scratch.read("gpio25/direction"), "in");
    assert_eq!(scratch.read("gpio25/edge"), "falling");
}

#[test]
fn drop_always_unexports_an_armed_line() {
    let scratch = ScratchGpioRoot::new("drop", &[4]);
    {
        let detector =
            GpioEdgeDetector::open_with(4, EdgeMode::Both, scratch.options()).unwrap();
        assert!(detector.is_polling());
        // No edge ever fires on a scratch file; teardown must still be
        // symmetric.
    }
    assert_eq!(scratch.read("unexport"), "4");
}

#[test]
fn edge_mode_strings_reach_the_line() {
    for (edge, expected) in [
        (EdgeMode::Rising, "rising"),
        (EdgeMode::Falling, "falling"),
        (EdgeMode::Both, "both"),
    ] {
        let scratch = ScratchGpioRoot::new(expected, &[2]);
        let _detector = GpioEdgeDetector::open_with(2, edge, scratch.options()).unwrap();
        assert_eq!(scratch.read("gpio2/edge"), expected);
    }
}

#[test]
fn missing_line_directory_fails_construction() {
    let scratch = ScratchGpioRoot::new("missing", &[]);
    // Export "succeeds" against the scratch file, but the line's
    // attribute files do not exist.
    assert!(GpioEdgeDetector::open_with(3, EdgeMode::Rising, scratch.options()).is_err());
}

#[test]
fn already_exported_line_is_tolerated() {
    let scratch = ScratchGpioRoot::new("reexport", &[9]);
    // Make the export control refuse writes, as sysfs does for a line
    // that is already exported.
    let export = scratch.root.join("export");
    let mut perms = fs::metadata(&export).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&export, perms).unwrap();

    let detector = GpioEdgeDetector::open_with(9, EdgeMode::Falling, scratch.options());

    let mut perms = fs::metadata(&export).unwrap().permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(&export, perms).unwrap();

    assert!(detector.unwrap().is_polling());
}

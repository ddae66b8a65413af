#![no_main]

use docpipe::ops::ExtractPages;
use docpipe::{Options, Processor};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| Builder::new_current_thread().enable_all().build().unwrap())
}

fuzz_target!(|data: &[u8]| {
    let dir = tempfile::TempDir::new().unwrap();
    let input = dir.path().join("input.pdf");
    std::fs::write(&input, data).unwrap();

    let options = Options::new().with("pages", "1-3");
    let mut processor = Processor::new(ExtractPages::new());
    runtime().block_on(processor.process(&input, dir.path().join("out.pdf"), &options));

    // Parser panics must surface here instead of being swallowed at the boundary.
    assert_ne!(processor.info().trace.as_deref(), Some("kind: panic"));
});

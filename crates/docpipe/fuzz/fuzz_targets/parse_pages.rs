#![no_main]

use docpipe::pdf::PageSet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let spec = String::from_utf8_lossy(data);
    let set = PageSet::parse(&spec);

    let pages = set.pages();
    assert!(pages.windows(2).all(|w| w[0] < w[1]));

    let selection = set.select(50);
    assert!(selection.valid.iter().all(|&p| (1..=50).contains(&p)));
    assert_eq!(selection.valid.len() + selection.out_of_range.len(), set.len());
});

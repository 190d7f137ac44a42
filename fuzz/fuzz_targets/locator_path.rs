#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{Path, parse};

const ARCH: &str = r#"<form><sheet><group name="a"><field name="x" class="o b"/>text</group><group/></sheet></form>"#;

fuzz_target!(|data: &[u8]| {
    let Ok(expr) = std::str::from_utf8(data) else {
        return;
    };
    let tree = parse(ARCH).expect("fixture parses");
    if let Ok(path) = Path::parse(expr) {
        let hits = path.select(&tree);
        assert!(hits.windows(2).all(|pair| pair[0] != pair[1]));
    }
});

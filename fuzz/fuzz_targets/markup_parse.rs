#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{SerializeStyle, parse, serialize};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tree) = parse(input) {
        let _ = serialize(&tree, tree.root(), SerializeStyle::Xml);
        let _ = serialize(&tree, tree.root(), SerializeStyle::Html);
    }
});

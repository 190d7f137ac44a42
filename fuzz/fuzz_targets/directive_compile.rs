#![no_main]

use directives::Compiler;
use libfuzzer_sys::fuzz_target;
use markup::parse;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tree) = parse(input) {
        let _ = Compiler::default().compile(&tree);
    }
});

#![no_main]

use html::traverse::walk_document_order;
use libfuzzer_sys::fuzz_target;
use std::ops::ControlFlow;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let _ = annotate::check_nesting(&input);
    let _ = annotate::annotation_stack_at(&input, input.len() / 2);

    let document = html::parse_document(&input);
    let mut ids = Vec::new();
    walk_document_order(&document, |node| {
        ids.push(node.id());
        ControlFlow::<()>::Continue(())
    });
    for id in ids {
        let _ = annotate::stack_for(&document, id);
    }
});

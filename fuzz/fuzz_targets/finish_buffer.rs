#![no_main]

use annotate::{
    AnnotationContext, AnnotationIndex, Collaborators, DependencyRegistry, Embed,
    EnqueuedDependency, FinishOptions, Invocation, InvocationSource, NoSources, finalize,
};
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value};

struct EnqueuedByFirst(Vec<AnnotationIndex>);

struct Call(AnnotationIndex);

impl Invocation for Call {
    fn index(&self) -> AnnotationIndex {
        self.0
    }

    fn produces_output(&self) -> bool {
        true
    }

    fn export(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("index".to_string(), Value::from(self.0.0));
        record
    }
}

struct Calls {
    calls: Vec<Call>,
    open: Vec<AnnotationIndex>,
}

impl InvocationSource for Calls {
    fn invocation(&self, index: AnnotationIndex) -> Option<&dyn Invocation> {
        self.calls
            .iter()
            .find(|call| call.0 == index)
            .map(|call| call as &dyn Invocation)
    }

    fn pop_open_invocation(&mut self) -> Option<AnnotationIndex> {
        self.open.pop()
    }

    fn invocation_indices(&self) -> Vec<AnnotationIndex> {
        self.calls.iter().map(|call| call.0).collect()
    }
}

impl DependencyRegistry for EnqueuedByFirst {
    fn invocations_enqueuing(&self, _registry: &str, _handle: &str) -> Vec<AnnotationIndex> {
        self.0.clone()
    }
}

// Input is split on NUL into fragments; fragments alternate between raw output and wrapped
// output so placeholders land in arbitrary places, including inside tags.
fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let mut context = AnnotationContext::new();
    let mut calls = Calls {
        calls: Vec::new(),
        open: Vec::new(),
    };
    let attributes = Map::new();
    let mut buffer = String::new();
    for (n, fragment) in input.split('\0').enumerate() {
        match n % 4 {
            0 => buffer.push_str(fragment),
            1 => {
                let script = EnqueuedDependency::script("h");
                buffer.push_str(&context.annotate_dependency(fragment, &script));
            }
            2 => {
                let embed = Embed {
                    url: fragment,
                    attributes: &attributes,
                    internal: false,
                };
                buffer.push_str(&context.annotate_embed(fragment, &embed));
            }
            _ => {
                let index = context.allocate_index();
                calls.calls.push(Call(index));
                calls.open.push(index);
                buffer.push_str(&format!("<!-- inv {index} -->{fragment}"));
            }
        }
    }
    let open_before = calls.open.len();
    let deps = EnqueuedByFirst(vec![AnnotationIndex(0)]);
    let collaborators = Collaborators {
        invocations: &mut calls,
        dependencies: &deps,
        sources: &NoSources,
    };
    let finished = finalize(buffer, context, collaborators, FinishOptions::default());
    assert!(calls.open.is_empty());
    assert!(open_before == 0 || finished.contains("/sourcery") || finished.contains("/-->"));
});

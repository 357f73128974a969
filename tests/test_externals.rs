//! Lazy external expansion: out-of-project symbols surface as placeholder
//! groups and expand on demand, one prefix level at a time.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use stix::{
    ExternalExpander, ExternalHandle, ExternalSeed, FileId, Module, Node, SourceLocation,
    SymbolPath,
};

fn loc(line: u32) -> SourceLocation {
    SourceLocation::new(FileId::new(9), line, 1)
}

/// Expands any requested path into a record node and hands back seeds for
/// the scripted children of that path. Records every expansion call.
struct ScriptedExpander {
    children: HashMap<String, Vec<SymbolPath>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ExternalExpander for ScriptedExpander {
    fn expand(
        &mut self,
        _handle: ExternalHandle,
        path: &SymbolPath,
    ) -> Option<(Node, Vec<ExternalSeed>)> {
        self.calls.borrow_mut().push(path.to_string());
        let node = Node::record(path.clone(), loc(1), true, false);
        let seeds = self
            .children
            .get(&path.to_string())
            .map(|kids| {
                kids.iter()
                    .map(|kid| ExternalSeed {
                        handle: ExternalHandle(0),
                        path: kid.clone(),
                        location: None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some((node, seeds))
    }
}

/// `::ext` containing `::ext::Outer` containing `::ext::Outer::Inner`.
fn scripted_module() -> (Module, Rc<RefCell<Vec<String>>>) {
    let ext = SymbolPath::root().join_name("ext");
    let outer = ext.join_name("Outer");
    let inner = outer.join_name("Inner");

    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut children = HashMap::new();
    children.insert(ext.to_string(), vec![outer.clone()]);
    children.insert(outer.to_string(), vec![inner]);

    let mut module = Module::new();
    module.set_external_expander(Box::new(ScriptedExpander {
        children,
        calls: Rc::clone(&calls),
    }));
    module.add_external(ExternalSeed {
        handle: ExternalHandle(1),
        path: ext,
        location: Some(loc(3)),
    });
    module.link_all().unwrap();
    (module, calls)
}

#[test]
fn test_deep_lookup_expands_prefixes_in_order() {
    let (mut module, calls) = scripted_module();
    let inner = SymbolPath::root()
        .join_name("ext")
        .join_name("Outer")
        .join_name("Inner");

    let found = module.find(&inner).expect("inner should resolve");
    let inner_id = found.one().expect("single node");

    assert_eq!(
        *calls.borrow(),
        vec![
            "::ext".to_string(),
            "::ext::Outer".to_string(),
            "::ext::Outer::Inner".to_string(),
        ]
    );

    // Expanded nodes are wired into an owner chain.
    let outer_id = module.node(inner_id).owner.expect("inner has an owner");
    assert_eq!(module.node(outer_id).path.to_string(), "::ext::Outer");
    assert!(module.node(outer_id).children.contains(&inner_id));
    let ext_id = module.node(outer_id).owner.expect("outer has an owner");
    assert_eq!(module.node(ext_id).path.to_string(), "::ext");
}

#[test]
fn test_expansion_happens_at_most_once() {
    let (mut module, calls) = scripted_module();
    let inner = SymbolPath::root()
        .join_name("ext")
        .join_name("Outer")
        .join_name("Inner");

    let first = module.find(&inner).unwrap().one().unwrap();
    let second = module.find(&inner).unwrap().one().unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.borrow().len(), 3, "no re-expansion on the second lookup");
}

#[test]
fn test_shallow_lookup_expands_only_what_it_needs() {
    let (mut module, calls) = scripted_module();
    let ext = SymbolPath::root().join_name("ext");

    module.find(&ext).expect("ext should resolve");
    assert_eq!(*calls.borrow(), vec!["::ext".to_string()]);
}

#[test]
fn test_miss_in_exhausted_group_is_a_cached_none() {
    let (mut module, calls) = scripted_module();
    let inner = SymbolPath::root()
        .join_name("ext")
        .join_name("Outer")
        .join_name("Inner");
    module.find(&inner).unwrap();
    let before = calls.borrow().len();

    let missing = SymbolPath::root().join_name("ext").join_name("Missing");
    assert!(module.find(&missing).is_none());
    assert!(module.find(&missing).is_none());

    assert_eq!(calls.borrow().len(), before, "a known miss never re-expands");
}

#[test]
fn test_unknown_root_resolves_to_none_without_expansion() {
    let (mut module, calls) = scripted_module();
    let nowhere = SymbolPath::root().join_name("nowhere").join_name("sym");

    assert!(module.find(&nowhere).is_none());
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_missing_expander_degrades_to_none() {
    let mut module = Module::new();
    let ext = SymbolPath::root().join_name("ext");
    module.add_external(ExternalSeed {
        handle: ExternalHandle(1),
        path: ext.clone(),
        location: Some(loc(3)),
    });
    module.link_all().unwrap();

    assert!(module.find(&ext).is_none());
}

#[test]
fn test_seed_occurrences_dedupe_by_location() {
    let (mut module, calls) = scripted_module();
    let ext = SymbolPath::root().join_name("ext");
    // The same sighting arriving from a second translation unit.
    module.add_external(ExternalSeed {
        handle: ExternalHandle(2),
        path: ext.clone(),
        location: Some(loc(3)),
    });

    let found = module.find(&ext).unwrap();
    assert!(found.one().is_some(), "duplicate seed must not split the hit");
    assert_eq!(*calls.borrow(), vec!["::ext".to_string()]);
}

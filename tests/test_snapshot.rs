//! Snapshot contract: persisted images carry explicit state only, are
//! deterministic, and re-linking a restored module regenerates every
//! derived product.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use stix::{
    CallableData, ExternalExpander, ExternalHandle, ExternalSeed, FileId, FileSet, MemberData,
    Module, Node, NodeKind, NodeKindTag, Segment, Snapshot, SourceLocation, SymbolPath, TypeRef,
    VirtualData, Visibility,
};

fn loc(line: u32) -> SourceLocation {
    SourceLocation::new(FileId::new(0), line, 1)
}

fn path(name: &str) -> SymbolPath {
    SymbolPath::root().join_name(name)
}

/// The file database the sample graph draws its locations from, interned
/// the way a front-end would before emitting any symbol.
fn sample_files() -> FileSet {
    let files = FileSet::new();
    files.file_id(Path::new("include/Object.hpp"));
    files.file_id(Path::new("include/Widget.hpp"));
    files
}

/// A small but representative graph: a base with a virtual destructor, a
/// derived record with a field, and an annotation.
fn build_sample(files: &FileSet, order_flipped: bool) -> Module {
    let mut module = Module::new();
    let object = path("Object");
    let widget = path("Widget");
    let object_hpp = files.file_id(Path::new("include/Object.hpp"));
    let widget_hpp = files.file_id(Path::new("include/Widget.hpp"));
    let at = |file: FileId, line: u32| SourceLocation::new(file, line, 1);

    let register_object = |module: &mut Module| {
        let id = module
            .register(Node::record(object.clone(), at(object_hpp, 1), true, false))
            .unwrap()
            .unwrap();
        module
            .register(
                Node::destructor(
                    object.join(Segment::call_parameterized("~Object", vec![], vec![])),
                    at(object_hpp, 2),
                    true,
                    MemberData::new(Visibility::Public),
                    VirtualData::explicit(true, false, false),
                    CallableData::new(None, vec![]),
                )
                .owned_by(id),
            )
            .unwrap();
    };
    let register_widget = |module: &mut Module| {
        let id = module
            .register(Node::record(widget.clone(), at(widget_hpp, 10), true, false))
            .unwrap()
            .unwrap();
        module
            .register(
                Node::base(
                    &widget,
                    path("Object"),
                    at(widget_hpp, 10),
                    Visibility::Public,
                    false,
                )
                .owned_by(id),
            )
            .unwrap();
        module
            .register(
                Node::field(
                    widget.join_name("size"),
                    at(widget_hpp, 11),
                    Visibility::Private,
                    TypeRef::literal("int"),
                )
                .owned_by(id),
            )
            .unwrap();
        module
            .register(Node::annotation(&widget, "stix::reflect", at(widget_hpp, 9)).owned_by(id))
            .unwrap();
    };

    if order_flipped {
        register_widget(&mut module);
        register_object(&mut module);
    } else {
        register_object(&mut module);
        register_widget(&mut module);
    }
    module
}

#[test]
fn test_snapshot_excludes_transients() {
    let files = sample_files();
    let mut module = build_sample(&files, false);
    module.link_all().unwrap();
    // Linking synthesized implicit ctors/dtors.
    assert!(!module.nodes_of_kind(NodeKindTag::Constructor).is_empty());

    let snapshot = module.snapshot();
    assert!(
        !snapshot
            .owned
            .iter()
            .any(|n| n.kind.tag() == NodeKindTag::Constructor),
        "synthesized constructors must not be persisted"
    );
    // The user-declared destructor survives; the synthesized one does not.
    let dtors: Vec<_> = snapshot
        .owned
        .iter()
        .filter(|n| n.kind.tag() == NodeKindTag::Destructor)
        .collect();
    assert_eq!(dtors.len(), 1);
    assert_eq!(dtors[0].owner, Some(path("Object")));
}

#[test]
fn test_snapshot_is_deterministic_across_registration_order() {
    let files = sample_files();
    let mut first = build_sample(&files, false);
    let mut second = build_sample(&files, true);
    first.link_all().unwrap();
    second.link_all().unwrap();

    let a = first.snapshot();
    let b = second.snapshot();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );

    // Every persisted location refers to a file the set knows about.
    let known: Vec<FileId> = files.entries().iter().map(|(id, _)| *id).collect();
    for node in &a.owned {
        for location in &node.declaration_locations {
            assert!(known.contains(&location.file));
        }
        if let Some(location) = node.definition_location {
            assert!(known.contains(&location.file));
        }
    }
}

#[test]
fn test_restore_roundtrip_regenerates_derived_state() {
    let files = sample_files();
    let mut module = build_sample(&files, false);
    module.link_all().unwrap();
    let snapshot = module.snapshot();

    // Through a file, as the build pipeline does between runs.
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("graph.json");
    std::fs::write(&file, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();
    let text = std::fs::read_to_string(&file).unwrap();
    let loaded: Snapshot = serde_json::from_str(&text).unwrap();
    assert_eq!(loaded, snapshot);

    let mut restored = Module::restore(loaded).unwrap();
    restored.link_all().unwrap();

    // Implicit members come back.
    let widget_ctor = path("Widget").join(Segment::call_parameterized("Widget", vec![], vec![]));
    let ctor = restored
        .find(&widget_ctor)
        .expect("implicit constructor regenerated")
        .one()
        .unwrap();
    assert!(restored.node(ctor).transient);

    // Virtual resolution comes back too: Widget's synthesized destructor
    // inherits Object's explicit virtual.
    let widget_dtor = path("Widget").join(Segment::call_parameterized("~Widget", vec![], vec![]));
    let dtor = restored.find(&widget_dtor).unwrap().one().unwrap();
    let virt = restored.node(dtor).virtual_data().unwrap();
    assert_eq!(virt.resolved_virtual, Some(true));
    assert_eq!(virt.resolved_override, Some(true));

    // Field types re-resolve.
    let field = restored
        .find(&path("Widget").join_name("size"))
        .unwrap()
        .one()
        .unwrap();
    match &restored.node(field).kind {
        NodeKind::Field { resolved, .. } => {
            assert!(resolved.as_ref().unwrap().node().is_some());
        }
        other => panic!("expected field, got {other:?}"),
    }

    // Restored locations still key into the host's file set.
    let object_dtor = path("Object").join(Segment::call_parameterized("~Object", vec![], vec![]));
    let od = restored.find(&object_dtor).unwrap().one().unwrap();
    let def = restored.node(od).definition_location.unwrap();
    assert_eq!(
        files.path(def.file),
        Some(PathBuf::from("include/Object.hpp"))
    );
    assert_eq!(
        files.lookup(Path::new("include/Object.hpp")),
        Some(def.file)
    );

    // And snapshotting the restored module reproduces the original image.
    assert_eq!(restored.snapshot(), snapshot);
}

#[test]
fn test_snapshot_carries_expanded_externals() {
    struct OneShot {
        calls: Rc<RefCell<usize>>,
    }
    impl ExternalExpander for OneShot {
        fn expand(
            &mut self,
            _handle: ExternalHandle,
            path: &SymbolPath,
        ) -> Option<(Node, Vec<ExternalSeed>)> {
            *self.calls.borrow_mut() += 1;
            Some((Node::record(path.clone(), loc(99), true, false), vec![]))
        }
    }

    let calls = Rc::new(RefCell::new(0));
    let mut module = Module::new();
    module.set_external_expander(Box::new(OneShot {
        calls: Rc::clone(&calls),
    }));
    let ext = path("ExternalThing");
    module.add_external(ExternalSeed {
        handle: ExternalHandle(7),
        path: ext.clone(),
        location: Some(loc(5)),
    });
    module.link_all().unwrap();
    module.find(&ext).expect("external expands");
    assert_eq!(*calls.borrow(), 1);

    let snapshot = module.snapshot();
    assert_eq!(snapshot.externals.len(), 1);
    assert_eq!(snapshot.externals[0].path, ext);

    // A restored module resolves the same symbol with no expander at all.
    let mut restored = Module::restore(snapshot).unwrap();
    restored.link_all().unwrap();
    let found = restored.find(&ext).expect("pre-expanded external resolves");
    assert!(found.one().is_some());
    assert_eq!(*calls.borrow(), 1);
}

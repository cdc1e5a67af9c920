//! Engine scenario tests for trellis-engine
//!
//! Handle lifetimes, the app loop and rendering, driven through the public
//! `Engine` API on the headless platform.

use std::collections::HashSet;

use trellis_engine::*;

fn engine() -> (Engine, HeadlessHandle) {
    Engine::headless(Config::default())
}

// ============================================================================
// HANDLE LIFETIMES
// ============================================================================

#[test]
fn test_live_handles_unique_across_kinds() {
    let (mut engine, _) = engine();
    let mut seen = HashSet::new();

    let app = engine.init_app().unwrap();
    assert!(seen.insert(app.raw()));
    let win = engine.create_window("w", 100, 100).unwrap();
    assert!(seen.insert(win.raw()));

    for _ in 0..20 {
        let doc = engine.create_document().unwrap();
        assert!(seen.insert(doc.raw()));
        for i in 0..10 {
            let node = if i % 2 == 0 {
                engine.create_element(doc, "div").unwrap()
            } else {
                engine.create_text_node(doc, "t").unwrap()
            };
            assert!(seen.insert(node.raw()));
        }
        let renderer = engine.create_renderer(doc, win).unwrap();
        assert!(seen.insert(renderer.raw()));
    }

    assert!(!seen.contains(&0));
    assert_eq!(engine.object_count(), seen.len());
}

#[test]
fn test_destroyed_handle_fails_every_operation() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let div = engine.create_element(doc, "div").unwrap();

    engine.destroy(div).unwrap();

    assert!(matches!(
        engine.node_id(div),
        Err(EngineError::InvalidHandle { .. })
    ));
    assert!(engine.append_child(doc, div).is_err());
    assert!(engine.query_selector(div, "*").is_err());
    assert!(engine.destroy(div).is_err());
    assert_eq!(engine.kind_of(div), None);
}

#[test]
fn test_stale_handle_never_aliases_new_object() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let old = engine.create_element(doc, "old").unwrap();
    engine.destroy(old).unwrap();

    let new = engine.create_element(doc, "new").unwrap();
    assert_ne!(old, new);
    assert!(engine.tag_name(old).is_err());
    assert_eq!(engine.tag_name(new).unwrap(), "new");
}

#[test]
fn test_zero_is_never_a_handle() {
    assert_eq!(Handle::from_raw(0), None);
}

#[test]
fn test_destroy_node_keeps_children_alive() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let outer = engine.create_element(doc, "section").unwrap();
    let inner = engine.create_element(doc, "p").unwrap();
    engine.append_child(doc, outer).unwrap();
    engine.append_child(outer, inner).unwrap();

    engine.destroy(outer).unwrap();

    assert_eq!(engine.parent_node(inner).unwrap(), None);
    assert_eq!(engine.first_child(doc).unwrap(), None);
    assert_eq!(engine.query_selector(doc, "section").unwrap(), None);
    // still owned by the document while detached
    assert_eq!(engine.query_selector(doc, "p").unwrap(), Some(inner));
    engine.append_child(doc, inner).unwrap();
    assert_eq!(engine.first_child(doc).unwrap(), Some(inner));
}

#[test]
fn test_destroy_document_invalidates_nodes_and_renderers() {
    let (mut engine, _) = engine();
    let win = engine.create_window("w", 10, 10).unwrap();
    let doc = engine.create_document().unwrap();
    let a = engine.create_element(doc, "a").unwrap();
    let b = engine.create_text_node(doc, "b").unwrap();
    let renderer = engine.create_renderer(doc, win).unwrap();
    let before = engine.object_count();

    engine.destroy(doc).unwrap();

    assert_eq!(engine.object_count(), before - 3);
    assert!(engine.node_id(a).is_err());
    assert!(engine.text(b).is_err());
    assert_eq!(
        engine.render(renderer),
        Err(EngineError::InvalidHandle {
            handle: renderer.raw(),
            expected: Some(ObjectKind::Renderer)
        })
    );
    assert!(engine.window(win).is_ok());
}

// ============================================================================
// TREE OPERATIONS
// ============================================================================

#[test]
fn test_cyclic_append_leaves_tree_unchanged() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let p = engine.create_element(doc, "p").unwrap();
    let c = engine.create_element(doc, "c").unwrap();
    engine.append_child(p, c).unwrap();

    assert_eq!(
        engine.append_child(c, p),
        Err(EngineError::CyclicAppend { parent: c, child: p })
    );
    assert_eq!(
        engine.append_child(p, p),
        Err(EngineError::CyclicAppend { parent: p, child: p })
    );
    assert_eq!(engine.child_nodes(p).unwrap(), [c]);
    assert_eq!(engine.parent_node(p).unwrap(), None);
}

#[test]
fn test_reappend_moves_child() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let first = engine.create_element(doc, "first").unwrap();
    let second = engine.create_element(doc, "second").unwrap();
    let child = engine.create_element(doc, "child").unwrap();

    engine.append_child(first, child).unwrap();
    engine.append_child(second, child).unwrap();

    assert_eq!(engine.parent_node(child).unwrap(), Some(second));
    assert!(engine.child_nodes(first).unwrap().is_empty());
    assert_eq!(engine.child_nodes(second).unwrap(), [child]);
}

#[test]
fn test_text_parent_rejected() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let text = engine.create_text_node(doc, "leaf").unwrap();
    let el = engine.create_element(doc, "b").unwrap();

    assert_eq!(engine.append_child(text, el), Err(EngineError::InvalidParent(text)));
}

#[test]
fn test_cross_document_append_rejected() {
    let (mut engine, _) = engine();
    let d1 = engine.create_document().unwrap();
    let d2 = engine.create_document().unwrap();
    let el = engine.create_element(d1, "div").unwrap();

    assert_eq!(
        engine.append_child(d2, el),
        Err(EngineError::WrongDocument { parent: d2, child: el })
    );
    assert_eq!(engine.document_of(el).unwrap(), d1);
}

#[test]
fn test_sibling_navigation_and_insert_before() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let list = engine.create_element(doc, "ul").unwrap();
    let a = engine.create_element(doc, "li").unwrap();
    let c = engine.create_element(doc, "li").unwrap();
    let b = engine.create_element(doc, "li").unwrap();

    engine.append_child(list, a).unwrap();
    engine.append_child(list, c).unwrap();
    engine.insert_before(list, b, Some(c)).unwrap();

    assert_eq!(engine.child_nodes(list).unwrap(), [a, b, c]);
    assert_eq!(engine.first_child(list).unwrap(), Some(a));
    assert_eq!(engine.last_child(list).unwrap(), Some(c));
    assert_eq!(engine.next_sibling(a).unwrap(), Some(b));
    assert_eq!(engine.previous_sibling(c).unwrap(), Some(b));
    assert_eq!(engine.previous_sibling(a).unwrap(), None);

    engine.remove_child(list, b).unwrap();
    assert_eq!(engine.child_nodes(list).unwrap(), [a, c]);
    assert_eq!(
        engine.remove_child(list, b),
        Err(EngineError::NotAChild { parent: list, child: b })
    );
}

#[test]
fn test_text_and_attributes() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let el = engine.create_element(doc, "DIV").unwrap();
    let text = engine.create_text_node(doc, "before").unwrap();

    assert_eq!(engine.tag_name(el).unwrap(), "div");
    assert_eq!(engine.node_kind(el).unwrap(), NodeKind::Element);
    assert_eq!(engine.node_kind(text).unwrap(), NodeKind::Text);
    assert_eq!(engine.node_kind(doc).unwrap(), NodeKind::Document);

    engine.set_text(text, "after").unwrap();
    assert_eq!(engine.text(text).unwrap(), "after");
    assert!(engine.set_text(el, "nope").is_err());

    engine.set_attribute(el, "class", "card wide").unwrap();
    assert_eq!(engine.attribute(el, "class").unwrap(), Some("card wide"));
    assert!(engine.set_attribute(text, "id", "x").is_err());
    assert_eq!(
        engine.remove_attribute(el, "class").unwrap(),
        Some("card wide".to_string())
    );
    assert_eq!(engine.attribute(el, "class").unwrap(), None);
}

// ============================================================================
// SELECTORS
// ============================================================================

#[test]
fn test_query_selector_document_and_node_roots() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let main = engine.create_element(doc, "main").unwrap();
    let card = engine.create_element(doc, "div").unwrap();
    let other = engine.create_element(doc, "div").unwrap();
    engine.set_attribute(card, "class", "card").unwrap();
    engine.set_attribute(other, "id", "other").unwrap();
    engine.append_child(doc, main).unwrap();
    engine.append_child(main, card).unwrap();
    engine.append_child(doc, other).unwrap();

    assert_eq!(engine.query_selector(doc, "div").unwrap(), Some(card));
    assert_eq!(engine.query_selector(doc, "#other").unwrap(), Some(other));
    assert_eq!(engine.query_selector(main, "#other").unwrap(), None);
    assert_eq!(engine.query_selector(main, "main").unwrap(), None);
    assert_eq!(engine.query_selector_all(doc, "div").unwrap(), [card, other]);
    assert!(engine.matches(card, ".card").unwrap());
    assert_eq!(engine.query_selector(doc, "main > div").unwrap(), None);
    assert_eq!(engine.query_selector(doc, "").unwrap(), None);
}

#[test]
fn test_query_selector_document_sees_unattached_nodes() {
    let (mut engine, _) = engine();
    let doc = engine.create_document().unwrap();
    let loose = engine.create_element(doc, "div").unwrap();
    assert_eq!(engine.query_selector(doc, "div").unwrap(), Some(loose));

    let attached = engine.create_element(doc, "div").unwrap();
    let holder = engine.create_element(doc, "aside").unwrap();
    let nested = engine.create_element(doc, "div").unwrap();
    engine.append_child(doc, attached).unwrap();
    engine.append_child(holder, nested).unwrap();

    assert_eq!(engine.query_selector(doc, "div").unwrap(), Some(attached));
    assert_eq!(engine.query_selector_all(doc, "div").unwrap(), [attached, loose, nested]);
    assert_eq!(engine.query_selector(attached, "div").unwrap(), None);

    // nodes of another document stay out of the scan
    let other = engine.create_document().unwrap();
    engine.create_element(other, "span").unwrap();
    assert_eq!(engine.query_selector(doc, "span").unwrap(), None);
}

#[test]
fn test_query_deterministic_across_rebuilds() {
    fn build(engine: &mut Engine) -> (Handle, Vec<String>) {
        let doc = engine.create_document().unwrap();
        for i in 0..5 {
            let section = engine.create_element(doc, "section").unwrap();
            engine.append_child(doc, section).unwrap();
            for j in 0..3 {
                let item = engine.create_element(doc, "span").unwrap();
                engine.set_attribute(item, "id", &format!("s{i}-{j}")).unwrap();
                engine.append_child(section, item).unwrap();
            }
        }
        let ids = engine
            .query_selector_all(doc, "span")
            .unwrap()
            .into_iter()
            .map(|h| engine.attribute(h, "id").unwrap().unwrap_or_default().to_string())
            .collect();
        (doc, ids)
    }

    let (mut engine, _) = engine();
    let (first_doc, first) = build(&mut engine);
    engine.destroy(first_doc).unwrap();
    let (_, second) = build(&mut engine);

    assert_eq!(first, second);
    assert_eq!(first[0], "s0-0");
    assert_eq!(first.len(), 15);
}

// ============================================================================
// APP LOOP
// ============================================================================

#[test]
fn test_init_twice_then_after_destroy() {
    let (mut engine, _) = engine();
    let app = engine.init_app().unwrap();

    assert_eq!(engine.init_app(), Err(EngineError::AlreadyInitialized));
    engine.destroy(app).unwrap();
    let again = engine.init_app().unwrap();
    assert_ne!(again, app);
    assert_eq!(engine.app_handle(), Some(again));
}

#[test]
fn test_multiple_apps_when_single_instance_disabled() {
    let config = Config { single_instance_app: false, ..Config::default() };
    let (mut engine, _) = Engine::headless(config);
    let first = engine.init_app().unwrap();
    let second = engine.init_app().unwrap();
    assert_ne!(first, second);
    assert_eq!(engine.app_handle(), Some(first));

    engine.tick(first).unwrap();
    engine.tick(first).unwrap();
    engine.tick(second).unwrap();
    assert_eq!(engine.app(first).unwrap().tick_count(), 2);
    assert_eq!(engine.app(second).unwrap().tick_count(), 1);

    let win = engine.create_window("w", 10, 10).unwrap();
    let doc = engine.create_document().unwrap();
    let renderer = engine.create_renderer(doc, win).unwrap();
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Presented);
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Unchanged);
    // a tick of any application starts a new step
    engine.tick(second).unwrap();
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Presented);

    engine.destroy(first).unwrap();
    assert_eq!(engine.app_handle(), Some(second));
    engine.destroy(second).unwrap();
    assert_eq!(engine.app_handle(), None);
}

#[test]
fn test_many_ticks_do_not_grow_state() {
    let (mut engine, _) = engine();
    let app = engine.init_app().unwrap();
    let before = engine.object_count();

    for _ in 0..10_000 {
        engine.tick(app).unwrap();
    }

    assert_eq!(engine.object_count(), before);
    assert_eq!(engine.app(app).unwrap().tick_count(), 10_000);
}

#[test]
fn test_tick_with_wrong_handle_fails() {
    let (mut engine, _) = engine();
    let win = engine.create_window("w", 1, 1).unwrap();
    assert!(engine.tick(win).is_err());
}

#[test]
fn test_close_request_visible_after_tick() {
    let (mut engine, platform) = engine();
    let app = engine.init_app().unwrap();
    let win = engine.create_window("w", 320, 200).unwrap();
    let platform_id = engine.window(win).unwrap().platform_id();

    platform.request_close(platform_id);
    assert!(!engine.should_close(win).unwrap());

    engine.tick(app).unwrap();
    assert!(engine.should_close(win).unwrap());
    assert_eq!(platform.pending_events(), 0);
}

#[test]
fn test_platform_resize_and_focus_applied() {
    let (mut engine, platform) = engine();
    let app = engine.init_app().unwrap();
    let win = engine.create_window("w", 320, 200).unwrap();
    let platform_id = engine.window(win).unwrap().platform_id();

    platform.request_resize(platform_id, 1024, 768);
    platform.set_focused(platform_id, true);
    engine.tick(app).unwrap();

    let state = engine.window(win).unwrap();
    assert_eq!(state.size(), (1024, 768));
    assert!(state.is_focused());
}

#[test]
fn test_window_state_forwarded_to_platform() {
    let (mut engine, platform) = engine();
    let win = engine.create_window("first", 0, -3).unwrap();
    let other = engine.create_window("other", 10, 10).unwrap();
    let platform_id = engine.window(win).unwrap().platform_id();

    assert_eq!(engine.window(win).unwrap().size(), (800, 600));

    engine.set_title(win, "second").unwrap();
    engine.resize(win, 640, 480).unwrap();
    engine.set_visibility(win, Visibility::Minimized).unwrap();
    engine.focus(other).unwrap();
    engine.focus(win).unwrap();

    let seen = platform.window(platform_id).unwrap();
    assert_eq!(seen.title, "second");
    assert_eq!((seen.width, seen.height), (640, 480));
    assert_eq!(seen.visibility, Visibility::Minimized);
    assert_eq!(engine.window(win).unwrap().visibility(), Visibility::Minimized);
    assert!(seen.focused);
    assert!(engine.window(win).unwrap().is_focused());
    assert!(!engine.window(other).unwrap().is_focused());

    engine.destroy(win).unwrap();
    assert_eq!(platform.window_count(), 1);
}

#[test]
fn test_wake_up_reaches_platform() {
    let (mut engine, platform) = engine();
    let app = engine.init_app().unwrap();

    engine.wake_up(app).unwrap();
    engine.wake_up(app).unwrap();

    assert_eq!(platform.wakeups(), 2);
    assert_eq!(engine.app(app).unwrap().wakeups(), 2);
}

// ============================================================================
// RENDERING
// ============================================================================

#[test]
fn test_hello_scenario() {
    let (mut engine, platform) = engine();
    let app = engine.init_app().unwrap();
    let win = engine.create_window("Hello", 400, 300).unwrap();
    let doc = engine.create_document().unwrap();
    let div = engine.create_element(doc, "div").unwrap();
    let text = engine.create_text_node(doc, "Hello").unwrap();
    engine.append_child(div, text).unwrap();
    engine.append_child(doc, div).unwrap();

    assert_eq!(engine.query_selector(doc, "div").unwrap(), Some(div));
    assert_eq!(engine.node_id(div).unwrap(), div);

    let renderer = engine.create_renderer(doc, win).unwrap();
    engine.tick(app).unwrap();
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Presented);

    let platform_id = engine.window(win).unwrap().platform_id();
    let frame = platform.window(platform_id).unwrap().last_frame.unwrap();
    assert_eq!(frame.items, [
        DisplayItem::Box { tag: "div".into(), depth: 1 },
        DisplayItem::Text { text: "Hello".into(), depth: 2 },
    ]);
    assert_eq!((frame.width, frame.height), (400, 300));
}

#[test]
fn test_render_idempotent_within_tick() {
    let (mut engine, platform) = engine();
    let app = engine.init_app().unwrap();
    let win = engine.create_window("w", 10, 10).unwrap();
    let doc = engine.create_document().unwrap();
    let renderer = engine.create_renderer(doc, win).unwrap();
    let platform_id = engine.window(win).unwrap().platform_id();

    engine.tick(app).unwrap();
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Presented);
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Unchanged);
    assert_eq!(platform.window(platform_id).unwrap().presented, 1);

    // a tree change within the same tick is picked up
    let p = engine.create_element(doc, "p").unwrap();
    engine.append_child(doc, p).unwrap();
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Presented);

    engine.tick(app).unwrap();
    assert_eq!(engine.render(renderer).unwrap(), RenderStatus::Presented);
    assert_eq!(engine.window(win).unwrap().frames_presented(), 3);
}

#[test]
fn test_renderer_requires_document_and_window() {
    let (mut engine, _) = engine();
    let win = engine.create_window("w", 10, 10).unwrap();
    let doc = engine.create_document().unwrap();

    assert!(engine.create_renderer(win, doc).is_err());
    assert!(engine.create_renderer(doc, win).is_ok());
}

// Host-side tests for the scene bridge, driven through fake camera, node and
// surface implementations that record every DOM write.

use frame_core::focus::PagePointerEvents;
use frame_core::{
    attach, BindOptions, BindingHandle, BoundingBox, BridgeConfig, BridgeError, CameraSource,
    FrameLayer, NodeSource, RenderHook, SceneBridge, Surface, W_DAMPING,
};
use glam::{DMat4, DVec2, DVec3};
use std::cell::RefCell;
use std::f64::consts::FRAC_PI_4;
use std::rc::Rc;

#[derive(Default)]
struct FakeSurface {
    size: Option<(f64, f64)>,
    perspective: Vec<Option<f64>>,
    camera_styles: Vec<String>,
    element_styles: Vec<(u32, String)>,
    prepared: Vec<(u32, f64, f64)>,
    children: Vec<u32>,
    detached: Vec<u32>,
    page_events: Vec<PagePointerEvents>,
}

impl FakeSurface {
    fn styles_for(&self, element: u32) -> Vec<&str> {
        self.element_styles
            .iter()
            .filter(|(e, _)| *e == element)
            .map(|(_, s)| s.as_str())
            .collect()
    }
}

impl Surface for FakeSurface {
    type Element = u32;

    fn set_size(&mut self, width: f64, height: f64) {
        self.size = Some((width, height));
    }
    fn set_perspective(&mut self, perspective_px: Option<f64>) {
        self.perspective.push(perspective_px);
    }
    fn set_camera_transform(&mut self, style: &str) {
        self.camera_styles.push(style.to_string());
    }
    fn prepare_element(&mut self, element: &u32, width_px: f64, height_px: f64) {
        self.prepared.push((*element, width_px, height_px));
    }
    fn set_element_transform(&mut self, element: &u32, style: &str) {
        self.element_styles.push((*element, style.to_string()));
    }
    fn is_camera_child(&self, element: &u32) -> bool {
        self.children.contains(element)
    }
    fn attach_to_camera(&mut self, element: &u32) {
        self.children.push(*element);
    }
    fn detach(&mut self, element: &u32) {
        self.children.retain(|e| e != element);
        self.detached.push(*element);
    }
    fn set_page_pointer_events(&mut self, state: PagePointerEvents) {
        self.page_events.push(state);
    }
}

struct NodeState {
    world: DMat4,
    bounds: BoundingBox,
    alive: bool,
}

#[derive(Clone)]
struct FakeNode(Rc<RefCell<NodeState>>);

impl FakeNode {
    fn at(position: DVec3) -> Self {
        Self(Rc::new(RefCell::new(NodeState {
            world: DMat4::from_translation(position),
            bounds: BoundingBox::new(DVec3::new(-1.0, -0.5, 0.0), DVec3::new(1.0, 0.5, 0.0)),
            alive: true,
        })))
    }
    fn set_world(&self, world: DMat4) {
        self.0.borrow_mut().world = world;
    }
    fn kill(&self) {
        self.0.borrow_mut().alive = false;
    }
}

impl NodeSource for FakeNode {
    fn world_matrix(&self) -> DMat4 {
        self.0.borrow().world
    }
    fn bounding_box(&self) -> BoundingBox {
        self.0.borrow().bounds
    }
    fn is_alive(&self) -> bool {
        self.0.borrow().alive
    }
}

struct FakeCamera {
    world: DMat4,
    projection: DMat4,
    orthographic: bool,
}

impl FakeCamera {
    fn perspective() -> Self {
        Self {
            world: DMat4::IDENTITY,
            projection: DMat4::perspective_rh(FRAC_PI_4, 4.0 / 3.0, 0.1, 100.0),
            orthographic: false,
        }
    }
}

impl CameraSource for FakeCamera {
    fn world_matrix(&self) -> DMat4 {
        self.world
    }
    fn projection_matrix(&self) -> DMat4 {
        self.projection
    }
    fn is_orthographic(&self) -> bool {
        self.orthographic
    }
}

fn bridge(config: BridgeConfig) -> SceneBridge<FakeSurface, FakeNode> {
    let mut bridge = SceneBridge::new(FakeSurface::default(), config);
    bridge.set_size(800.0, 600.0);
    bridge
}

fn parse_matrix3d(style: &str) -> DMat4 {
    let start = style.find("matrix3d(").expect("matrix3d in style") + "matrix3d(".len();
    let end = start + style[start..].find(')').expect("closing paren");
    let values: Vec<f64> = style[start..end]
        .split(',')
        .map(|v| v.parse().expect("number"))
        .collect();
    assert_eq!(values.len(), 16);
    DMat4::from_cols_slice(&values)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn second_tick_without_changes_writes_nothing() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    bridge
        .register(FakeNode::at(DVec3::new(0.0, 0.0, -5.0)), 1, BindOptions::default())
        .unwrap();
    bridge
        .register(FakeNode::at(DVec3::new(2.0, 1.0, -5.0)), 2, BindOptions::default())
        .unwrap();

    let first = bridge.tick(&camera);
    assert!(first.perspective_written);
    assert!(first.camera_written);
    assert_eq!(first.styles_written, 2);
    assert_eq!(first.reparented, 2);

    let second = bridge.tick(&camera);
    assert_eq!(second.dom_writes(), 0);
    assert_eq!(bridge.surface().element_styles.len(), 2);
    assert_eq!(bridge.surface().camera_styles.len(), 1);
    assert_eq!(bridge.surface().perspective.len(), 1);
}

#[test]
fn moving_a_node_rewrites_only_that_node() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    let a = FakeNode::at(DVec3::new(0.0, 0.0, -5.0));
    bridge.register(a.clone(), 1, BindOptions::default()).unwrap();
    bridge
        .register(FakeNode::at(DVec3::new(1.0, 0.0, -5.0)), 2, BindOptions::default())
        .unwrap();
    bridge.tick(&camera);

    a.set_world(DMat4::from_translation(DVec3::new(0.5, 0.0, -5.0)));
    let report = bridge.tick(&camera);
    assert_eq!(report.styles_written, 1);
    assert_eq!(bridge.surface().styles_for(1).len(), 2);
    assert_eq!(bridge.surface().styles_for(2).len(), 1);
    assert!(!report.camera_written);
}

#[test]
fn identity_camera_projects_node_offset_with_flipped_y_and_z() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    let (x, y, z) = (1.5, -0.75, -4.0);
    let resolution = 100.0;
    let handle = bridge
        .register(
            FakeNode::at(DVec3::new(x, y, z)),
            1,
            BindOptions::with_resolution(resolution),
        )
        .unwrap();
    bridge.tick(&camera);

    let camera_style = bridge.surface().camera_styles.last().unwrap().clone();
    let object_style = bridge.last_style(handle).unwrap().to_string();
    assert!(camera_style.ends_with("translate(400px,300px)"));
    assert!(object_style.starts_with("translate(-50%,-50%)matrix3d("));

    let composed = parse_matrix3d(&camera_style) * parse_matrix3d(&object_style);
    let w = composed.w_axis.w;
    assert!(close(w, W_DAMPING));
    let t = composed.w_axis.truncate() / w;
    let expected = DVec3::new(x, -y, -z) / W_DAMPING;
    assert!(close(t.x, expected.x), "{} vs {}", t.x, expected.x);
    assert!(close(t.y, expected.y), "{} vs {}", t.y, expected.y);
    assert!(close(t.z, expected.z), "{} vs {}", t.z, expected.z);

    // one element pixel spans 1/resolution scene units, in the same space
    let x_basis = composed.x_axis.x / w;
    assert!(close(x_basis, (1.0 / resolution) / W_DAMPING));
    let y_basis = composed.y_axis.y / w;
    assert!(close(y_basis, (1.0 / resolution) / W_DAMPING));
}

#[test]
fn resize_drives_perspective_from_half_height() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    bridge.set_size(800.0, 600.0);
    bridge.tick(&camera);
    let expected = camera.projection.y_axis.y * 300.0;
    assert_eq!(bridge.surface().perspective.last(), Some(&Some(expected)));
    assert_eq!(bridge.surface().size, Some((800.0, 600.0)));
    assert_eq!(bridge.size(), DVec2::new(800.0, 600.0));

    bridge.set_size(1024.0, 768.0);
    let report = bridge.tick(&camera);
    assert!(report.perspective_written);
    assert!(report.camera_written);
    let expected = camera.projection.y_axis.y * 384.0;
    assert_eq!(bridge.surface().perspective.last(), Some(&Some(expected)));
    assert!(bridge
        .surface()
        .camera_styles
        .last()
        .unwrap()
        .ends_with("translate(512px,384px)"));
}

#[test]
fn orthographic_camera_clears_perspective() {
    let mut bridge = bridge(BridgeConfig::default());
    let mut camera = FakeCamera::perspective();
    bridge.tick(&camera);
    camera.orthographic = true;
    camera.projection = DMat4::orthographic_rh(-4.0, 4.0, -3.0, 3.0, 0.1, 100.0);
    let report = bridge.tick(&camera);
    assert!(report.perspective_written);
    assert_eq!(bridge.surface().perspective.last(), Some(&None));
}

#[test]
fn unregister_detaches_and_stops_writes() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    let node = FakeNode::at(DVec3::new(0.0, 0.0, -3.0));
    let handle = bridge
        .register(node.clone(), 7, BindOptions::default())
        .unwrap();
    bridge.tick(&camera);
    assert!(bridge.surface().children.contains(&7));

    bridge.unregister(handle).unwrap();
    assert!(!bridge.surface().children.contains(&7));
    assert_eq!(bridge.surface().detached, vec![7]);

    node.set_world(DMat4::from_translation(DVec3::new(1.0, 1.0, -3.0)));
    let report = bridge.tick(&camera);
    assert_eq!(report.styles_written, 0);
    assert_eq!(bridge.surface().styles_for(7).len(), 1);
    assert!(!bridge.surface().children.contains(&7));
    assert!(bridge.is_empty());
}

#[test]
fn unregistering_twice_is_an_error() {
    let mut bridge = bridge(BridgeConfig::default());
    let handle = bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::default())
        .unwrap();
    bridge.unregister(handle).unwrap();
    assert_eq!(
        bridge.unregister(handle).err(),
        Some(BridgeError::UnknownBinding(handle))
    );
}

#[test]
fn binding_an_element_twice_is_rejected() {
    let mut bridge = bridge(BridgeConfig::default());
    let first = bridge
        .register(FakeNode::at(DVec3::ZERO), 3, BindOptions::default())
        .unwrap();
    let err = bridge
        .register(FakeNode::at(DVec3::X), 3, BindOptions::default())
        .unwrap_err();
    assert_eq!(err, BridgeError::ElementAlreadyBound(first));
    assert_eq!(bridge.len(), 1);

    // once released the element can be bound again
    bridge.unregister(first).unwrap();
    assert!(bridge
        .register(FakeNode::at(DVec3::X), 3, BindOptions::default())
        .is_ok());
}

#[test]
fn bad_options_are_rejected() {
    let mut bridge = bridge(BridgeConfig::default());
    for resolution in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = bridge
            .register(
                FakeNode::at(DVec3::ZERO),
                1,
                BindOptions::with_resolution(resolution),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidOptions(_)));
    }
    let err = bridge
        .register(
            FakeNode::at(DVec3::ZERO),
            1,
            BindOptions::default().content_size(DVec2::new(1.0, 0.0)),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidOptions(_)));
    assert!(bridge.is_empty());
    assert!(bridge.surface().prepared.is_empty());
}

#[test]
fn element_is_sized_from_bounds_and_resolution() {
    let mut bridge = bridge(BridgeConfig::default());
    let handle = bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::with_resolution(50.0))
        .unwrap();
    assert_eq!(bridge.content_size(handle), Some(DVec2::new(2.0, 1.0)));
    assert_eq!(bridge.surface().prepared, vec![(1, 100.0, 50.0)]);

    let handle = bridge
        .register(
            FakeNode::at(DVec3::ZERO),
            2,
            BindOptions::with_resolution(10.0).content_size(DVec2::new(4.0, 3.0)),
        )
        .unwrap();
    assert_eq!(bridge.content_size(handle), Some(DVec2::new(4.0, 3.0)));
    assert_eq!(bridge.surface().prepared[1], (2, 40.0, 30.0));
}

#[test]
fn validation_reports_the_content_size_without_touching_the_surface() {
    let bridge = bridge(BridgeConfig::default());
    let node = FakeNode::at(DVec3::ZERO);
    assert_eq!(
        bridge.validate(&node, &BindOptions::default()),
        Ok(DVec2::new(2.0, 1.0))
    );

    let flat = FakeNode::at(DVec3::ZERO);
    flat.0.borrow_mut().bounds = BoundingBox::new(DVec3::ZERO, DVec3::ZERO);
    assert!(matches!(
        bridge.validate(&flat, &BindOptions::default()),
        Err(BridgeError::InvalidOptions(_))
    ));
    assert!(matches!(
        bridge.validate(&node, &BindOptions::with_resolution(0.0)),
        Err(BridgeError::InvalidOptions(_))
    ));
    assert!(matches!(
        bridge.validate(
            &node,
            &BindOptions::default().content_size(DVec2::new(f64::NAN, 1.0))
        ),
        Err(BridgeError::InvalidOptions(_))
    ));
    assert!(bridge.surface().prepared.is_empty());
    assert!(bridge.is_empty());
}

#[test]
fn invalid_node_transform_does_not_block_other_nodes() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    let broken = FakeNode::at(DVec3::ZERO);
    broken.set_world(DMat4::from_translation(DVec3::new(f64::NAN, 0.0, 0.0)));
    let bad = bridge.register(broken, 1, BindOptions::default()).unwrap();
    bridge
        .register(FakeNode::at(DVec3::new(0.0, 0.0, -2.0)), 2, BindOptions::default())
        .unwrap();

    let report = bridge.tick(&camera);
    assert_eq!(report.styles_written, 1);
    assert_eq!(
        report.errors.as_slice(),
        &[BridgeError::InvalidTransform {
            handle: bad,
            what: "world matrix"
        }]
    );
    assert!(bridge.surface().styles_for(1).is_empty());
    assert_eq!(bridge.surface().styles_for(2).len(), 1);

    // still skipped, still reported, binding kept
    let report = bridge.tick(&camera);
    assert_eq!(report.errors.len(), 1);
    assert!(bridge.contains(bad));
}

#[test]
fn invalid_camera_skips_the_tick() {
    let mut bridge = bridge(BridgeConfig::default());
    let mut camera = FakeCamera::perspective();
    camera.world = DMat4::from_translation(DVec3::new(0.0, f64::INFINITY, 0.0));
    bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::default())
        .unwrap();
    let report = bridge.tick(&camera);
    assert_eq!(report.dom_writes(), 0);
    assert_eq!(
        report.errors.as_slice(),
        &[BridgeError::InvalidCamera {
            what: "world matrix"
        }]
    );

    camera.world = DMat4::IDENTITY;
    let report = bridge.tick(&camera);
    assert!(report.errors.is_empty());
    assert_eq!(report.styles_written, 1);
}

#[test]
fn dead_nodes_are_unregistered_automatically() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    let node = FakeNode::at(DVec3::ZERO);
    let handle = bridge.register(node.clone(), 4, BindOptions::default()).unwrap();
    bridge.tick(&camera);

    node.kill();
    let report = bridge.tick(&camera);
    assert_eq!(report.stale.as_slice(), &[handle]);
    assert!(!bridge.contains(handle));
    assert!(!bridge.surface().children.contains(&4));
    assert_eq!(bridge.surface().styles_for(4).len(), 1);
}

#[test]
fn detached_elements_are_reattached_without_restyling() {
    let mut bridge = bridge(BridgeConfig::default());
    let camera = FakeCamera::perspective();
    bridge
        .register(FakeNode::at(DVec3::ZERO), 5, BindOptions::default())
        .unwrap();
    bridge.tick(&camera);

    bridge.surface_mut().children.clear();
    let report = bridge.tick(&camera);
    assert_eq!(report.reparented, 1);
    assert_eq!(report.styles_written, 0);
    assert_eq!(bridge.surface().children, vec![5]);
}

#[test]
fn legacy_mode_folds_camera_into_objects() {
    let mut bridge = bridge(BridgeConfig {
        legacy_compat_mode: true,
        ..BridgeConfig::default()
    });
    let camera = FakeCamera::perspective();
    let handle = bridge
        .register(FakeNode::at(DVec3::new(0.0, 0.0, -5.0)), 1, BindOptions::default())
        .unwrap();
    let report = bridge.tick(&camera);
    assert!(!report.camera_written);
    assert!(bridge.surface().camera_styles.is_empty());
    assert!(report.perspective_written);

    let style = bridge.last_style(handle).unwrap();
    assert!(style.starts_with("translate(-50%,-50%)translate(400px,300px)translateZ("));
    assert_eq!(style.matches("matrix3d(").count(), 2);
}

#[test]
fn camera_transform_is_applied_once_in_either_mode() {
    for legacy in [false, true] {
        let mut bridge = bridge(BridgeConfig {
            legacy_compat_mode: legacy,
            ..BridgeConfig::default()
        });
        let rejected = bridge.register(
            FakeNode::at(DVec3::ZERO),
            1,
            BindOptions::default().legacy_compat_mode(!legacy),
        );
        assert!(matches!(rejected, Err(BridgeError::InvalidOptions(_))));
        assert!(bridge.surface().prepared.is_empty());

        let handle = bridge
            .register(
                FakeNode::at(DVec3::ZERO),
                1,
                BindOptions::default().legacy_compat_mode(legacy),
            )
            .unwrap();
        let mut camera = FakeCamera::perspective();
        camera.world = DMat4::from_translation(DVec3::new(0.0, 0.0, 10.0));
        bridge.tick(&camera);

        // the camera part starts with translateZ; container and element compose
        let in_container: usize = bridge
            .surface()
            .camera_styles
            .iter()
            .map(|s| s.matches("translateZ(").count())
            .sum();
        let in_element = bridge
            .last_style(handle)
            .unwrap()
            .matches("translateZ(")
            .count();
        assert_eq!(in_container + in_element, 1, "legacy={}", legacy);
        assert_eq!(in_element == 1, legacy);
    }
}

#[test]
fn focus_is_a_noop_for_overlay_frames() {
    let mut bridge = bridge(BridgeConfig::default());
    let handle = bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::default())
        .unwrap();
    assert_eq!(bridge.focus(handle), Ok(false));
    assert!(bridge.surface().page_events.is_empty());
}

#[test]
fn embedded_focus_toggles_page_pointer_events() {
    let mut bridge = bridge(BridgeConfig {
        layer: FrameLayer::Embedded,
        ..BridgeConfig::default()
    });
    let a = bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::default())
        .unwrap();
    let b = bridge
        .register(FakeNode::at(DVec3::X), 2, BindOptions::default())
        .unwrap();

    assert_eq!(bridge.focus(a), Ok(true));
    assert_eq!(bridge.focus(a), Ok(false));
    assert_eq!(bridge.focus(b), Ok(true));
    assert_eq!(bridge.surface().page_events, vec![PagePointerEvents::None]);

    assert_eq!(bridge.blur(a), Ok(true));
    assert!(!bridge.is_focused(a));
    assert_eq!(bridge.surface().page_events.len(), 1);

    // unregistering the last focused frame gives input back to the page
    bridge.unregister(b).unwrap();
    assert_eq!(
        bridge.surface().page_events,
        vec![PagePointerEvents::None, PagePointerEvents::Auto]
    );
    assert_eq!(
        bridge.focus(b),
        Err(BridgeError::UnknownBinding(b))
    );
}

struct ManualHook {
    callbacks: RefCell<Vec<Box<dyn FnMut()>>>,
}

impl ManualHook {
    fn fire(&self) {
        for cb in self.callbacks.borrow_mut().iter_mut() {
            cb();
        }
    }
}

impl RenderHook for ManualHook {
    fn on_before_render(&self, callback: Box<dyn FnMut()>) {
        self.callbacks.borrow_mut().push(callback);
    }
}

#[test]
fn attached_bridge_projects_on_each_render() {
    let shared = Rc::new(RefCell::new(bridge(BridgeConfig::default())));
    let node = FakeNode::at(DVec3::new(0.0, 0.0, -5.0));
    shared
        .borrow_mut()
        .register(node.clone(), 1, BindOptions::default())
        .unwrap();
    let hook = ManualHook {
        callbacks: RefCell::new(Vec::new()),
    };
    attach(shared.clone(), Rc::new(FakeCamera::perspective()), &hook);

    hook.fire();
    assert_eq!(shared.borrow().surface().styles_for(1).len(), 1);
    node.set_world(DMat4::from_translation(DVec3::new(1.0, 0.0, -5.0)));
    hook.fire();
    assert_eq!(shared.borrow().surface().styles_for(1).len(), 2);
}

#[test]
fn handles_are_not_reused() {
    let mut bridge = bridge(BridgeConfig::default());
    let a = bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::default())
        .unwrap();
    bridge.unregister(a).unwrap();
    let b = bridge
        .register(FakeNode::at(DVec3::ZERO), 1, BindOptions::default())
        .unwrap();
    assert_ne!(a, b);
    assert_eq!(b, BindingHandle::from_id(a.id() + 1));
}

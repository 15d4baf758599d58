//! End-to-end support generation on simple objects.

use slicer_support::clipper::intersection;
use slicer_support::{
    ExPolygon, LayerStack, Polygon, Print, PrintConfig, PrintObjectConfig, Prism, SupportPattern,
    SurfaceType,
};

const EPS: f64 = 1e-6;

fn cube(size: f64) -> LayerStack {
    LayerStack::new(vec![Prism::cuboid([0.0; 3], [size; 3])])
}

/// A 10mm column under a 30mm plate; the plate overhangs on every side.
fn t_shape() -> LayerStack {
    LayerStack::new(vec![
        Prism::cuboid([10.0, 10.0, 0.0], [20.0, 20.0, 10.0]),
        Prism::cuboid([0.0, 0.0, 10.0], [30.0, 30.0, 12.0]),
    ])
}

fn run(stack: LayerStack, print_config: PrintConfig, object_config: PrintObjectConfig) -> Print {
    let mut print = Print::with_config(print_config, object_config);
    print.add_object(Box::new(stack));
    print.generate_support_material().unwrap();
    print
}

#[test]
fn cube_needs_no_support() {
    let print = run(
        cube(20.0),
        PrintConfig::default(),
        PrintObjectConfig::default().support(true),
    );
    let object = print.get_object(0).unwrap();
    assert!(object.layer_count() > 0);
    assert_eq!(object.support_layer_count(), 0);
}

#[test]
fn cube_on_raft() {
    let mut print = Print::new();
    print.config.set_deserialize("nozzle_diameter", "0.5").unwrap();
    print.default_object_config.set_deserialize("raft_layers", "3").unwrap();
    print.default_object_config.set_deserialize("first_layer_height", "0.4").unwrap();
    print.default_object_config.set_deserialize("layer_height", "0.3").unwrap();
    print.add_object(Box::new(cube(20.0)));
    print.generate_support_material().unwrap();

    let object = print.get_object(0).unwrap();
    assert_eq!(object.support_layer_count(), 3);
    let object_bottom = object.layers()[0].bottom_z();
    for layer in object.support_layers() {
        assert!(layer.print_z <= object_bottom + EPS);
        assert!(layer.is_raft);
        assert!(!layer.is_empty());
    }
    assert!((object.support_layers()[0].print_z - 0.4).abs() < EPS);
}

#[test]
fn overhang_without_support_or_raft() {
    let print = run(t_shape(), PrintConfig::default(), PrintObjectConfig::default());
    assert_eq!(print.get_object(0).unwrap().support_layer_count(), 0);
}

#[test]
fn overhang_with_raft_only() {
    let print = run(
        t_shape(),
        PrintConfig::default(),
        PrintObjectConfig::default().raft_layers(2),
    );
    let object = print.get_object(0).unwrap();
    assert_eq!(object.support_layer_count(), 2);
}

#[test]
fn overhang_gets_support() {
    let print = run(
        t_shape(),
        PrintConfig::default().nozzle_diameter(0.4),
        PrintObjectConfig::default().support(true),
    );
    let object = print.get_object(0).unwrap();
    let layers = object.support_layers();
    assert!(!layers.is_empty());

    // intermediate layers never exceed 0.8 × nozzle
    for pair in layers.windows(2) {
        let height = pair[1].print_z - pair[0].print_z;
        assert!(height > 0.0);
        assert!(height <= 0.32 + EPS, "support layer {} is {}mm", pair[1].id, height);
        assert!((pair[1].height - height).abs() < EPS);
    }

    // support stays under the plate and clear of the column
    let column = vec![ExPolygon::new(Polygon::square_mm(10.0, 10.0, 10.0))];
    let mid = layers
        .iter()
        .find(|l| l.print_z > 4.0 && l.print_z < 6.0)
        .unwrap();
    let regions = mid.all_regions();
    assert!(!regions.is_empty());
    assert!(intersection(&regions, &column).is_empty());
    assert!(layers.last().unwrap().print_z < 10.0);
    assert!(layers.iter().any(|l| !l.contact.is_empty()));
    assert!(layers.iter().all(|l| !l.is_raft));
    assert!(mid.extrusion_length() > 0.0);
}

#[test]
fn pattern_decides_base_type() {
    let pillars = run(
        t_shape(),
        PrintConfig::default().nozzle_diameter(0.4),
        PrintObjectConfig::default().support(true),
    );
    let layers = pillars.get_object(0).unwrap().support_layers();
    assert!(layers.iter().any(|l| !l.regions_of_type(SurfaceType::SupportPillar).is_empty()));

    let lines = run(
        t_shape(),
        PrintConfig::default().nozzle_diameter(0.4),
        PrintObjectConfig::default()
            .support(true)
            .support_pattern(SupportPattern::Rectilinear),
    );
    let layers = lines.get_object(0).unwrap().support_layers();
    assert!(layers.iter().all(|l| l.regions_of_type(SurfaceType::SupportPillar).is_empty()));
    assert!(layers.iter().any(|l| !l.regions_of_type(SurfaceType::SupportBase).is_empty()));
}

/// A 20mm block standing on a 6mm foot 0.9mm tall.
fn stepped() -> LayerStack {
    LayerStack::new(vec![
        Prism::cuboid([7.0, 7.0, 0.0], [13.0, 13.0, 0.9]),
        Prism::cuboid([0.0, 0.0, 0.9], [20.0, 20.0, 5.0]),
    ])
}

#[test]
fn enforced_layers_add_support() {
    let none = run(stepped(), PrintConfig::default(), PrintObjectConfig::default());
    assert_eq!(none.get_object(0).unwrap().support_layer_count(), 0);

    // the overhang sits within the enforced bottom layers
    let enforced = run(
        stepped(),
        PrintConfig::default(),
        PrintObjectConfig::default().enforce_layers(5),
    );
    let object = enforced.get_object(0).unwrap();
    assert!(object.support_layer_count() > 0);
    let block_bottom = object.layers()[3].bottom_z();
    assert!(object.support_layers().iter().all(|l| l.print_z < block_bottom));
}

#[test]
fn enforced_layers_without_overhang() {
    let print = run(
        cube(20.0),
        PrintConfig::default(),
        PrintObjectConfig::default().enforce_layers(5).support(false),
    );
    let object = print.get_object(0).unwrap();
    assert!(object.support_layer_count() > 0);
    let enforced_top = object.layers()[4].print_z;
    assert!(object.support_layers().iter().all(|l| l.print_z < enforced_top));
    assert!(object.support_layers().iter().all(|l| !l.is_raft));
}

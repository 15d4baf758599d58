//! 3MF write/read round trips.

use slicer_support::{
    read_tmf, read_tmf_file, write_tmf, write_tmf_file, Model, ModelInstance, ModelMaterial,
    ModelObject, ModelVolume, Print, TriangleMesh,
};
use std::io::Cursor;

fn sample_model() -> Model {
    let mut model = Model::new();
    model.metadata.insert("Title".into(), "Round & trip".into());
    model.metadata.insert("Designer".into(), "tests".into());

    let mut pla = ModelMaterial::new("PLA");
    pla.attributes.insert("displaycolor".into(), "#FF8000FF".into());
    pla.config.insert("first_layer_temperature".into(), "215".into());
    model.add_material("0", pla);
    model.add_material("1", ModelMaterial::new("TPU"));

    let mut bracket = ModelObject::new("bracket");
    bracket.config.insert("support_material".into(), "1".into());
    bracket.config.insert("raft_layers".into(), "2".into());
    bracket.add_volume(ModelVolume::new(TriangleMesh::cuboid([0.0; 3], [30.0, 10.0, 5.0])).material_id("0"));
    let mut arm = TriangleMesh::cuboid([0.0, 0.0, 5.0], [5.0, 10.0, 25.0]);
    arm.translate(25.0, 0.0, 0.0);
    let mut arm = ModelVolume::new(arm).material_id("1");
    arm.config.insert("perimeters".into(), "4".into());
    bracket.add_volume(arm);
    bracket.add_volume(ModelVolume::new(TriangleMesh::cube(3.0)).modifier(true));
    bracket.add_instance(ModelInstance::new([50.0, 50.0, 0.0]));
    bracket.add_instance(
        ModelInstance::new([100.0, 40.0, 0.0])
            .rotation([0.0, 0.0, 1.2])
            .scaling_factor([1.0, 2.0, 1.0]),
    );
    model.add_object(bracket);

    let mut pin = ModelObject::new("pin");
    pin.add_volume(ModelVolume::new(TriangleMesh::cube(4.0)));
    pin.add_instance(ModelInstance::new([-10.0, 5.0, 0.0]).rotation([0.2, 0.3, 0.4]));
    model.add_object(pin);

    model
}

fn assert_same_geometry(original: &Model, loaded: &Model) {
    assert_eq!(loaded.objects.len(), original.objects.len());
    for (a, b) in original.objects.iter().zip(&loaded.objects) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.config, b.config);
        assert_eq!(a.volumes.len(), b.volumes.len());
        for (va, vb) in a.volumes.iter().zip(&b.volumes) {
            assert_eq!(va.mesh.vertices.len(), vb.mesh.vertices.len());
            assert_eq!(va.mesh.facets_count(), vb.mesh.facets_count());
            assert_eq!(va.mesh, vb.mesh);
            assert_eq!(va.modifier, vb.modifier);
            assert_eq!(va.config, vb.config);
            assert_eq!(va.material_id, vb.material_id);
        }
        assert_eq!(a.instances.len(), b.instances.len());
        for (ia, ib) in a.instances.iter().zip(&b.instances) {
            for (x, y) in ia.matrix().iter().zip(ib.matrix().iter()) {
                assert!((x - y).abs() < 1e-6, "{:?} != {:?}", ia, ib);
            }
        }
    }
}

#[test]
fn round_trip_in_memory() {
    let model = sample_model();
    let mut buffer = Cursor::new(Vec::new());
    write_tmf(&model, &mut buffer).unwrap();
    buffer.set_position(0);

    let loaded = read_tmf(buffer).unwrap();
    assert_same_geometry(&model, &loaded);
    assert_eq!(loaded.metadata, model.metadata);
    assert_eq!(loaded.materials.len(), 2);
    assert_eq!(loaded.materials["0"].name(), Some("PLA"));
    assert_eq!(loaded.materials["0"].display_color(), Some("#FF8000FF"));
    assert_eq!(loaded.materials["1"].display_color(), Some("#FFFFFFFF"));
    assert_eq!(
        loaded.materials["0"].config.get("first_layer_temperature").map(String::as_str),
        Some("215")
    );
}

#[test]
fn round_trip_file() {
    let model = sample_model();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bracket.3mf");
    write_tmf_file(&model, &path).unwrap();

    let loaded = read_tmf_file(&path).unwrap();
    assert_same_geometry(&model, &loaded);

    // writing what was read gives the same model again
    let again = dir.path().join("again.3mf");
    write_tmf_file(&loaded, &again).unwrap();
    let reloaded = read_tmf_file(&again).unwrap();
    assert_same_geometry(&loaded, &reloaded);
    assert_eq!(reloaded.materials, loaded.materials);
}

#[test]
fn loaded_objects_feed_the_print() {
    let mut buffer = Cursor::new(Vec::new());
    write_tmf(&sample_model(), &mut buffer).unwrap();
    buffer.set_position(0);
    let model = read_tmf(buffer).unwrap();

    let mut print = Print::new();
    for object in &model.objects {
        print.add_model_object(object).unwrap();
    }
    assert_eq!(print.object_count(), 2);
    let bracket = print.get_object_mut(0).unwrap();
    assert_eq!(bracket.config.raft_layers, 2);
    assert!(bracket.config.support_material);
    assert!((bracket.height() - 25.0).abs() < 1e-9);

    // the arm stands on the base, so only the raft is needed
    bracket.generate_support_material().unwrap();
    assert_eq!(bracket.support_layer_count(), 2);
    assert!(bracket.support_layers().iter().all(|l| l.is_raft));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_tmf_file(dir.path().join("nope.3mf")).is_err());
}

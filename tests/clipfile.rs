use glam::{Mat4, Vec3};
use serde_json::json;
use skeletal_animator::{
    resource_system::file_formats::clipfile::ClipFile, Clip, ClipError, Interpolation,
    PoseSampler, SamplerConfig,
};

fn walk_cycle() -> serde_json::Value {
    json!({
        "ticks_per_second": 24.0,
        "duration": 48.0,
        "nodes": [
            { "name": "Armature", "children": [1] },
            { "name": "Hips", "children": [2, 3],
              "transform": [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 1.0]] },
            { "name": "LeftLeg" },
            { "name": "RightLeg" }
        ],
        "bones": [
            { "name": "Hips", "slot": 0 },
            { "name": "LeftLeg", "slot": 1 },
            { "name": "RightLeg", "slot": 2 }
        ],
        "tracks": [
            {
                "name": "LeftLeg",
                "shared_times": [0.0, 24.0, 48.0],
                "translation": {
                    "values": [[0.0, 0.0, 0.0], [0.0, 0.0, 2.0], [0.0, 0.0, 0.0]],
                    "interpolation": "Linear"
                }
            }
        ]
    })
}

#[test]
fn parses_and_samples_a_clip_description() {
    let clip = Clip::from_json(&walk_cycle().to_string()).unwrap();
    assert_eq!(clip.ticks_per_second(), 24.0);
    assert_eq!(clip.duration(), 48.0);
    assert_eq!(clip.root_node().len(), 4);
    assert_eq!(clip.max_slot(), Some(2));
    assert!(clip.find_bone_track("LeftLeg").is_some());
    assert!(clip.find_bone_track("RightLeg").is_none());

    let mut sampler = PoseSampler::with_clip(SamplerConfig::default(), &clip);
    sampler.advance(0.5); // 12 ticks, halfway to the first key

    let palette = sampler.palette();
    assert!(palette[0].abs_diff_eq(Mat4::from_translation(Vec3::Y), 1e-5));
    assert!(palette[1].abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 1.0, 1.0)), 1e-5));
    assert!(palette[2].abs_diff_eq(Mat4::from_translation(Vec3::Y), 1e-5));
}

#[test]
fn hierarchy_order_follows_declared_children() {
    let clip = Clip::from_json(&walk_cycle().to_string()).unwrap();
    let tree = clip.root_node();
    let hips = tree.get(tree.root()).unwrap().children[0];
    let names: Vec<_> = tree
        .get(hips)
        .unwrap()
        .children
        .iter()
        .map(|&id| tree.get(id).unwrap().name.as_str())
        .collect();
    assert_eq!(names, ["LeftLeg", "RightLeg"]);
}

#[test]
fn defaults_fill_optional_fields() {
    let file: ClipFile = serde_json::from_value(json!({
        "ticks_per_second": 30.0,
        "duration": 0.0,
        "nodes": [{ "name": "root" }],
        "tracks": [{
            "name": "root",
            "rotation": { "times": [0.0], "values": [[0.0, 0.0, 0.0, 1.0]] }
        }]
    }))
    .unwrap();
    assert!(file.bones.is_empty());
    assert_eq!(file.nodes[0].transform, Mat4::IDENTITY.to_cols_array_2d());
    assert_eq!(file.tracks[0].rotation.as_ref().unwrap().interpolation, Interpolation::Linear);
    assert!(Clip::from_file(file).is_ok());
}

#[test]
fn rejects_empty_hierarchy() {
    let err = Clip::from_json(r#"{ "ticks_per_second": 1.0, "duration": 1.0, "nodes": [] }"#).unwrap_err();
    assert!(matches!(err, ClipError::EmptyHierarchy));
}

#[test]
fn rejects_child_out_of_range() {
    let mut doc = walk_cycle();
    doc["nodes"][1]["children"] = json!([2, 9]);
    let err = Clip::from_json(&doc.to_string()).unwrap_err();
    assert!(matches!(err, ClipError::ChildOutOfRange { node: 1, child: 9, count: 4 }));
}

#[test]
fn rejects_cycles_and_shared_children() {
    let mut cyclic = walk_cycle();
    cyclic["nodes"][2]["children"] = json!([0]);
    assert!(matches!(
        Clip::from_json(&cyclic.to_string()).unwrap_err(),
        ClipError::NotATree(0)
    ));

    let mut shared = walk_cycle();
    shared["nodes"][0]["children"] = json!([1, 2]);
    assert!(matches!(
        Clip::from_json(&shared.to_string()).unwrap_err(),
        ClipError::NotATree(2)
    ));
}

#[test]
fn rejects_bad_timing() {
    let mut doc = walk_cycle();
    doc["ticks_per_second"] = json!(-24.0);
    assert!(matches!(
        Clip::from_json(&doc.to_string()).unwrap_err(),
        ClipError::InvalidTiming { field: "ticks_per_second", .. }
    ));
}

#[test]
fn rejects_mismatched_keyframes() {
    let mut doc = walk_cycle();
    doc["tracks"][0]["translation"]["values"] = json!([[0.0, 0.0, 0.0]]);
    assert!(matches!(
        Clip::from_json(&doc.to_string()).unwrap_err(),
        ClipError::MalformedChannel { channel: "translation", .. }
    ));

    let mut unsorted = walk_cycle();
    unsorted["tracks"][0]["shared_times"] = json!([0.0, 30.0, 24.0]);
    assert!(matches!(
        Clip::from_json(&unsorted.to_string()).unwrap_err(),
        ClipError::UnsortedKeyframes { .. }
    ));
}

#[test]
fn reports_json_errors() {
    let err = Clip::from_json("{ not json").unwrap_err();
    assert!(matches!(err, ClipError::Json(_)));
    assert!(err.to_string().starts_with("failed to parse clip"));
}

#[test]
fn unreachable_nodes_are_dropped() {
    let mut doc = walk_cycle();
    doc["nodes"][1]["children"] = json!([2]);
    let clip = Clip::from_json(&doc.to_string()).unwrap();
    assert_eq!(clip.root_node().len(), 3);
    assert!(clip.root_node().find("RightLeg").is_none());
}

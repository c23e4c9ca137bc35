#![warn(clippy::pedantic)]

use approx::assert_relative_eq;
use fecase::reference::{JsonResultStore, ReferenceGeometry, ReferenceMesher, ReferenceSolver};
use fecase::{
    force, point, point2, CaseDefinition, Job, JobOptions, Point, Profile, ResultDatabase,
    ResultService, SectionRegion, WaitOptions,
};

const LENGTH: f64 = 5.0;
const ELASTIC_MODULUS: f64 = 200.0e9;
const TIP_FORCE: f64 = 100.0;

/// Beam B is turned a quarter turn about Z through the origin, then moved
/// two metres along X. Maps a part point to assembly coordinates.
fn beam_b(local: Point) -> Point {
    point(2.0 - local.y, local.x, local.z)
}

fn tip_deflection() -> f64 {
    let second_moment = 0.2 * 0.2_f64.powi(3) / 12.0;
    TIP_FORCE * LENGTH.powi(3) / (3.0 * ELASTIC_MODULUS * second_moment)
}

/// Two instances of one beam, the second independent and repositioned,
/// each clamped at the root and pushed down at the tip in its own axes.
fn two_beams() -> CaseDefinition {
    let mut geometry = ReferenceGeometry::new();
    let mut mesher = ReferenceMesher::new(geometry.bodies());
    let mut case = CaseDefinition::new("Two Beams");

    let profile =
        Profile::rectangle(point2(0.1, 0.1), point2(0.3, -0.1)).expect("valid rectangle");
    let part = case
        .create_part(&mut geometry, "Beam", profile, LENGTH)
        .expect("part created");
    case.define_material("AISI 1005 Steel", 7872.0, ELASTIC_MODULUS, 0.29)
        .expect("material defined");
    let section = case
        .define_section("Beam Section", "AISI 1005 Steel")
        .expect("section defined");
    case.assign_section(&geometry, &part, &SectionRegion::AllCells, &section)
        .expect("section assigned");

    let a = case
        .instantiate(&mut geometry, "Beam A", &part, true)
        .expect("dependent instance");
    let b = case
        .instantiate(&mut geometry, "Beam B", &part, false)
        .expect("independent instance");
    case.rotate_instance(&b, point(0.0, 0.0, 0.0), [0.0, 0.0, 1.0], 90.0)
        .expect("rotated");
    case.translate_instance(&b, [2.0, 0.0, 0.0])
        .expect("translated");

    case.create_static_step("Apply Load", "Initial", "Tip forces")
        .expect("step created");

    let root = point(0.2, 0.0, 0.0);
    let tip = point(0.2, 0.0, LENGTH);
    case.encastre(&geometry, "Fixed A", "Initial", &a, root)
        .expect("root of A clamped");
    case.encastre(&geometry, "Fixed B", "Initial", &b, beam_b(root))
        .expect("root of B clamped");
    case.apply_concentrated_force(
        &geometry,
        "Tip A",
        "Apply Load",
        &a,
        tip,
        force(0.0, -TIP_FORCE, 0.0),
    )
    .expect("tip force on A");
    // Part -Y points along assembly +X once B is turned.
    case.apply_concentrated_force(
        &geometry,
        "Tip B",
        "Apply Load",
        &b,
        beam_b(tip),
        force(TIP_FORCE, 0.0, 0.0),
    )
    .expect("tip force on B");

    case.seed_part(&part, 0.1, 0.1).expect("seeded");
    case.generate_mesh(&mut mesher, &part).expect("meshed");
    case
}

fn solve(case: &CaseDefinition) -> ResultDatabase {
    let dir = tempfile::tempdir().expect("temporary directory");
    let mut solver = ReferenceSolver::new(dir.path());
    let mut job = Job::new("TwoBeamsJob", case, JobOptions::default()).expect("job created");
    job.submit(case, &mut solver, false).expect("submitted");
    let artifact = job
        .wait_for_completion(&mut solver, &WaitOptions::default())
        .expect("job completes");
    JsonResultStore.open(&artifact).expect("artifact readable")
}

#[test]
fn independent_instance_gets_its_own_body_and_mesh() {
    let case = two_beams();
    let instances = case.assembly().instances();
    let a = instances
        .get(&instances.lookup("Beam A").expect("Beam A registered"))
        .expect("Beam A");
    let b = instances
        .get(&instances.lookup("Beam B").expect("Beam B registered"))
        .expect("Beam B");

    assert!(a.is_dependent());
    assert!(a.own_mesh().is_none());
    assert!(!b.is_dependent());
    assert_ne!(a.body(), b.body());
    let own = b.own_mesh().expect("independent mesh generated");
    let shared = case
        .parts()
        .iter()
        .next()
        .and_then(|part| part.mesh())
        .expect("part mesh generated");
    assert_eq!(own.element_count, shared.element_count);

    let moved = b.to_assembly(point(0.2, 0.0, LENGTH));
    assert_relative_eq!(moved.x, 2.0, epsilon = 1.0e-12);
    assert_relative_eq!(moved.y, 0.2, epsilon = 1.0e-12);
    assert_relative_eq!(moved.z, LENGTH, epsilon = 1.0e-12);
}

#[test]
fn repositioned_instance_deflects_like_the_original() {
    let case = two_beams();
    let result = solve(&case);
    let expected = tip_deflection();

    let tip_a = result
        .displacement_near("Beam A", point(0.2, 0.0, LENGTH))
        .expect("tip of A written");
    assert_relative_eq!(tip_a.y, -expected, max_relative = 1.0e-4);
    assert_relative_eq!(tip_a.x, 0.0, epsilon = 1.0e-12);

    let tip_b = result
        .displacement_near("Beam B", beam_b(point(0.2, 0.0, LENGTH)))
        .expect("tip of B written");
    assert_relative_eq!(tip_b.x, expected, max_relative = 1.0e-4);
    assert_relative_eq!(tip_b.y, 0.0, epsilon = 1.0e-12);

    let frame = result.last_frame().expect("one frame");
    let root_b = frame
        .nearest_node("Beam B", beam_b(point(0.2, 0.0, 0.0)))
        .expect("root of B");
    assert_relative_eq!(root_b.position.x, 2.0, epsilon = 1.0e-9);
    assert_relative_eq!(root_b.position.y, 0.2, epsilon = 1.0e-9);
    let reaction = frame.total_reaction();
    assert_relative_eq!(reaction.x, -TIP_FORCE, max_relative = 1.0e-6);
    assert_relative_eq!(reaction.y, TIP_FORCE, max_relative = 1.0e-6);
}

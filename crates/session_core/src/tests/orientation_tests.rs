use super::*;
use shared::domain::{Activity, GridPos};

fn agent(id: i64, orientation: Heading) -> Agent {
    Agent {
        id: AgentId(id),
        pos: GridPos::new(1, 1),
        orientation,
        activity: Activity::Moving,
    }
}

#[test]
fn delta_is_non_negative_quarter_turn_for_every_heading_pair() {
    for previous in Heading::ALL {
        for current in Heading::ALL {
            let Rotation::Delta(delta) = rotation_between(Some(previous), current) else {
                panic!("known previous heading must yield a delta");
            };
            assert!([0, 90, 180, 270].contains(&delta));
            let expected =
                (i32::from(current.index()) - i32::from(previous.index())).rem_euclid(4) * 90;
            assert_eq!(i32::from(delta), expected, "{previous:?} -> {current:?}");
        }
    }
}

#[test]
fn counter_clockwise_quarter_turn_is_expressed_as_270() {
    assert_eq!(
        rotation_between(Some(Heading::East), Heading::North),
        Rotation::Delta(270)
    );
    assert_eq!(
        rotation_between(Some(Heading::North), Heading::West),
        Rotation::Delta(270)
    );
}

#[test]
fn first_sighting_maps_heading_to_absolute_angle() {
    assert_eq!(rotation_between(None, Heading::North), Rotation::Absolute(0));
    assert_eq!(rotation_between(None, Heading::South), Rotation::Absolute(180));
    assert_eq!(rotation_between(None, Heading::West).degrees(), 270);
}

#[test]
fn memory_tracks_headings_between_observations() {
    let mut memory = OrientationMemory::new();

    let first = memory.observe(vec![agent(1, Heading::East)]);
    assert_eq!(first[0].rotation, Rotation::Absolute(90));
    assert_eq!(memory.heading_of(AgentId(1)), Some(Heading::East));

    let second = memory.observe(vec![agent(1, Heading::South)]);
    assert_eq!(second[0].rotation, Rotation::Delta(90));

    let third = memory.observe(vec![agent(1, Heading::South)]);
    assert_eq!(third[0].rotation, Rotation::Delta(0));
}

#[test]
fn memory_prunes_agents_missing_from_latest_observation() {
    let mut memory = OrientationMemory::new();
    memory.observe(vec![agent(1, Heading::North), agent(2, Heading::West)]);
    assert_eq!(memory.len(), 2);

    memory.observe(vec![agent(2, Heading::North)]);
    assert!(!memory.contains(AgentId(1)));
    assert_eq!(memory.len(), 1);

    // A returning agent is treated as a first sighting.
    let poses = memory.observe(vec![agent(1, Heading::South), agent(2, Heading::North)]);
    assert_eq!(poses[0].rotation, Rotation::Absolute(180));
    assert_eq!(poses[1].rotation, Rotation::Delta(0));
}

#[test]
fn observation_order_does_not_matter() {
    let mut memory = OrientationMemory::new();
    memory.observe(vec![agent(1, Heading::North), agent(2, Heading::East)]);

    let poses = memory.observe(vec![agent(2, Heading::South), agent(1, Heading::East)]);
    assert_eq!(poses[0].agent.id, AgentId(2));
    assert_eq!(poses[0].rotation, Rotation::Delta(90));
    assert_eq!(poses[1].rotation, Rotation::Delta(90));
}

#[test]
fn clear_forgets_everything() {
    let mut memory = OrientationMemory::new();
    memory.observe(vec![agent(1, Heading::North)]);
    memory.clear();
    assert!(memory.is_empty());
}

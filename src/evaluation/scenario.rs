use crate::sim::vec2::Vec2;

/// Side length of the shared square arena.
pub const ARENA_SIZE: f64 = 10.0;

pub type Polygon = Vec<Vec2>;

/// Immutable obstacle layout plus the four fixed agent start/goal pairs.
///
/// One scenario value per optimization target replaces the original's four
/// near-identical evaluation routines; the arena strips and agent corners
/// are shared, only the interior obstacles differ.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    /// Four strips enclosing the arena.
    pub boundaries: Vec<Polygon>,
    /// Interior obstacle polygons.
    pub obstacles: Vec<Polygon>,
    /// Each agent starts at a corner and heads for the diagonally
    /// opposite one.
    pub agents: [(Vec2, Vec2); 4],
}

fn polygon(vertices: &[(f64, f64)]) -> Polygon {
    vertices.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
}

fn corner_agents() -> [(Vec2, Vec2); 4] {
    [
        (Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)),
        (Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)),
        (Vec2::new(10.0, 10.0), Vec2::new(0.0, 0.0)),
        (Vec2::new(0.0, 10.0), Vec2::new(10.0, 0.0)),
    ]
}

fn arena_boundaries() -> Vec<Polygon> {
    vec![
        polygon(&[(-1.0, -1.0), (-1.0, 11.0), (-1.5, 11.5), (-1.5, -1.5)]),
        polygon(&[(-1.0, 11.0), (11.0, 11.0), (11.5, 11.5), (-1.5, 11.5)]),
        polygon(&[(11.0, 11.0), (11.0, -1.0), (11.5, -1.5), (11.5, 11.5)]),
        polygon(&[(11.0, -1.0), (-1.0, -1.0), (-1.5, -1.5), (11.5, -1.5)]),
    ]
}

/// The four quadrant blocks shared by scenarios II and III.
fn quadrant_blocks() -> Vec<Polygon> {
    vec![
        polygon(&[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0)]),
        polygon(&[(6.0, 2.0), (8.0, 2.0), (8.0, 4.0), (6.0, 4.0)]),
        polygon(&[(6.0, 6.0), (8.0, 6.0), (8.0, 8.0), (6.0, 8.0)]),
        polygon(&[(2.0, 6.0), (4.0, 6.0), (4.0, 8.0), (2.0, 8.0)]),
    ]
}

impl Scenario {
    /// Single 2×2 block in the middle of the arena.
    pub fn scenario1() -> Scenario {
        Scenario {
            name: "scenario1",
            boundaries: arena_boundaries(),
            obstacles: vec![polygon(&[(6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])],
            agents: corner_agents(),
        }
    }

    /// One 2×2 block per quadrant.
    pub fn scenario2() -> Scenario {
        Scenario {
            name: "scenario2",
            boundaries: arena_boundaries(),
            obstacles: quadrant_blocks(),
            agents: corner_agents(),
        }
    }

    /// The quadrant blocks plus 1×1 blocks at the edge midpoints and the
    /// center.
    pub fn scenario3() -> Scenario {
        let mut obstacles = quadrant_blocks();
        obstacles.extend([
            polygon(&[(4.5, 0.5), (5.5, 0.5), (5.5, 1.5), (4.5, 1.5)]),
            polygon(&[(8.5, 4.5), (9.5, 4.5), (9.5, 5.5), (8.5, 5.5)]),
            polygon(&[(4.5, 8.5), (5.5, 8.5), (5.5, 9.5), (4.5, 9.5)]),
            polygon(&[(0.5, 4.5), (1.5, 4.5), (1.5, 5.5), (0.5, 5.5)]),
            polygon(&[(4.5, 4.5), (5.5, 4.5), (5.5, 5.5), (4.5, 5.5)]),
        ]);
        Scenario {
            name: "scenario3",
            boundaries: arena_boundaries(),
            obstacles,
            agents: corner_agents(),
        }
    }

    /// The densest layout: a lattice of small blocks, the edge ones
    /// extending past the arena boundary.
    pub fn scenario4() -> Scenario {
        Scenario {
            name: "scenario4",
            boundaries: arena_boundaries(),
            obstacles: vec![
                polygon(&[(1.5, 2.5), (2.5, 2.5), (2.5, 3.5), (1.5, 3.5)]),
                polygon(&[(7.5, 2.5), (8.5, 2.5), (8.5, 3.5), (7.5, 3.5)]),
                polygon(&[(7.5, 6.5), (8.5, 6.5), (8.5, 7.5), (7.5, 7.5)]),
                polygon(&[(1.5, 6.5), (2.5, 6.5), (2.5, 7.5), (1.5, 7.5)]),
                polygon(&[(4.5, -0.5), (5.5, -0.5), (5.5, 1.5), (4.5, 1.5)]),
                polygon(&[(8.5, 4.5), (10.5, 4.5), (10.5, 5.5), (8.5, 5.5)]),
                polygon(&[(4.5, 8.5), (5.5, 8.5), (5.5, 10.5), (4.5, 10.5)]),
                polygon(&[(-0.5, 4.5), (1.5, 4.5), (1.5, 5.5), (-0.5, 5.5)]),
                polygon(&[(4.5, 4.5), (5.5, 4.5), (5.5, 5.5), (4.5, 5.5)]),
                polygon(&[(4.5, 2.5), (5.5, 2.5), (5.5, 3.5), (4.5, 3.5)]),
                polygon(&[(6.5, 4.5), (7.5, 4.5), (7.5, 5.5), (6.5, 5.5)]),
                polygon(&[(4.5, 6.5), (5.5, 6.5), (5.5, 7.5), (4.5, 7.5)]),
                polygon(&[(2.5, 4.5), (3.5, 4.5), (3.5, 5.5), (2.5, 5.5)]),
            ],
            agents: corner_agents(),
        }
    }

    pub fn by_name(name: &str) -> Option<Scenario> {
        match name {
            "scenario1" => Some(Self::scenario1()),
            "scenario2" => Some(Self::scenario2()),
            "scenario3" => Some(Self::scenario3()),
            "scenario4" => Some(Self::scenario4()),
            _ => None,
        }
    }

    pub fn names() -> [&'static str; 4] {
        ["scenario1", "scenario2", "scenario3", "scenario4"]
    }
}

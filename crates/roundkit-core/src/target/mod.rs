mod generator;
mod model;

pub use generator::TargetGenerator;
pub use model::{
    Direction, Kinematics, Playfield, Point, SwipeBand, SwipeRequirement, Target, TargetId,
    Vector,
};

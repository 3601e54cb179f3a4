pub mod gesture_mapping;
pub mod user;

pub use gesture_mapping::GestureMappingRow;
pub use user::User;

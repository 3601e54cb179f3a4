pub mod gesture_mappings;
pub mod users;

pub use gesture_mappings::GestureMappingRepository;
pub use users::UserRepository;

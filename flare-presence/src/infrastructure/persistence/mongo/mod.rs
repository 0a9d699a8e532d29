mod statistic_repository;
mod user_profile_repository;

pub use statistic_repository::MongoDailyStatisticRepository;
pub use user_profile_repository::MongoUserProfileRepository;

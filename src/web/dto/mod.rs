pub mod certificates;
pub mod checkout;
pub mod courses;
pub mod lessons;
pub mod media;
pub mod quizzes;
pub mod steps;

pub mod grading_client;
pub mod topic_client;

pub use grading_client::{
    classify_failure, GradingBackend, SubmissionClient, Task1Submission, Task2Submission,
};
pub use topic_client::{TomlTopicBank, TopicProvider};

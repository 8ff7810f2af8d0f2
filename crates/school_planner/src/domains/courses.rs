//! Course normalization and per-class grouping for the calendar view.

use std::cmp::Ordering;
use std::collections::HashMap;

use futures_util::future::join_all;
use school_api_client::RawCourse;
use serde::Serialize;

/// Label used when a course has no subject or a class has no grade level.
pub const UNASSIGNED: &str = "Nicht zugeordnet";

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub id: String,
    pub name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub class_id: String,
    pub class_name: String,
    pub class_level: String,
}

/// A planned topic span inside a course.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub text: String,
    pub color: String,
    pub utc_start_date: i64,
    pub utc_end_date: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTopics {
    pub subject_id: String,
    pub subject_name: String,
    pub topics: Vec<Topic>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassTopicsRow {
    pub class_id: String,
    pub class_name: String,
    pub class_level: String,
    pub subjects: Vec<SubjectTopics>,
}

/// Flatten one course; `None` when it has no class for the school year.
///
/// Only the first class counts even when a course spans several.
pub fn normalize_course(course: &RawCourse) -> Option<CourseRow> {
    let class = course.classes.first()?;
    let (subject_id, subject_name) = match &course.subject {
        Some(subject) => (subject.id.clone(), subject.label.clone()),
        None => (String::new(), UNASSIGNED.to_string()),
    };
    let (class_level, class_name) = match &class.grade_level {
        Some(level) => (level.name.clone(), format!("{}{}", level.name, class.name)),
        None => (UNASSIGNED.to_string(), class.name.clone()),
    };
    Some(CourseRow {
        id: course.id.clone(),
        name: course.name.clone(),
        subject_id,
        subject_name,
        class_id: class.id.clone(),
        class_name,
        class_level,
    })
}

/// Normalize and stably sort by class level.
pub fn normalize_courses(courses: &[RawCourse]) -> Vec<CourseRow> {
    let mut rows: Vec<CourseRow> = courses.iter().filter_map(normalize_course).collect();
    rows.sort_by(|a, b| locale_compare(&a.class_level, &b.class_level));
    rows
}

/// Collation close to a German/English locale compare: accents and case are
/// ignored first, then lowercase sorts before uppercase, then raw code points.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| case_key(a).cmp(&case_key(b)))
        .then_with(|| a.cmp(b))
}

fn collation_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

fn case_key(s: &str) -> Vec<bool> {
    s.chars().map(char::is_uppercase).collect()
}

/// Topics for one course. Topic instances are not served by the API yet,
/// so every course gets an empty list.
pub async fn topics_for_course(_course: &CourseRow) -> Vec<Topic> {
    Vec::new()
}

/// Attach topics to every course, fetching all courses concurrently.
pub async fn populate_topics(courses: Vec<CourseRow>) -> Vec<(CourseRow, Vec<Topic>)> {
    let topics = join_all(courses.iter().map(topics_for_course)).await;
    courses.into_iter().zip(topics).collect()
}

/// Group rows per class, keeping first-seen order of classes and subjects.
pub fn group_by_class(courses: Vec<(CourseRow, Vec<Topic>)>) -> Vec<ClassTopicsRow> {
    let mut rows: Vec<ClassTopicsRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (course, topics) in courses {
        let subject = SubjectTopics {
            subject_id: course.subject_id,
            subject_name: course.subject_name,
            topics,
        };
        match index.get(&course.class_id) {
            Some(&i) => rows[i].subjects.push(subject),
            None => {
                index.insert(course.class_id.clone(), rows.len());
                rows.push(ClassTopicsRow {
                    class_id: course.class_id,
                    class_name: course.class_name,
                    class_level: course.class_level,
                    subjects: vec![subject],
                });
            }
        }
    }
    rows
}

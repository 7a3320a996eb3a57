//! Public course catalog.

use crate::error::{TrainingError, TrainingErrorExt};
use crate::model::{CourseDetail, CourseSummary, ModuleOutline};
use feq_database::Database;
use feq_kernel::domain::constants::{COURSES, MODULES};

const COURSE_COLUMNS: &str = "id,slug,title,description,price_cents";

pub(crate) async fn active_courses(db: &Database) -> Result<Vec<CourseSummary>, TrainingError> {
    db.anon()
        .from(COURSES)
        .select(COURSE_COLUMNS)
        .eq("active", true)
        .order("title", true)
        .fetch()
        .await
        .context("Loading courses")
}

pub(crate) async fn course_by_slug(db: &Database, slug: &str) -> Result<CourseDetail, TrainingError> {
    let course: Option<CourseSummary> = db
        .anon()
        .from(COURSES)
        .select(COURSE_COLUMNS)
        .eq("slug", slug)
        .eq("active", true)
        .fetch_optional()
        .await
        .context("Loading course")?;
    let course = course.ok_or_else(|| TrainingError::not_found(format!("no course '{slug}'")))?;

    let modules: Vec<ModuleOutline> = db
        .anon()
        .from(MODULES)
        .select("id,order_index,title")
        .eq("course_id", course.id)
        .order("order_index", true)
        .fetch()
        .await
        .context("Loading course outline")?;

    Ok(CourseDetail { course, modules })
}

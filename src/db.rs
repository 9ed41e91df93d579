use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::import::ParsedImport;
use crate::models::{Class, Grade, GradeChanges, ImportSummary, Student};
use crate::seed;
use crate::store::GradeBook;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let sample = seed::sample_book()?;

    for class in &sample.classes {
        sqlx::query(
            r#"
            INSERT INTO gradebook.classes (id, grade_level, class_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET grade_level = EXCLUDED.grade_level, class_name = EXCLUDED.class_name
            "#,
        )
        .bind(&class.id)
        .bind(class.grade_level)
        .bind(&class.class_name)
        .execute(pool)
        .await?;
    }

    for student in &sample.students {
        sqlx::query(
            r#"
            INSERT INTO gradebook.students (id, name, student_number, class_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.student_number)
        .bind(&student.class_id)
        .execute(pool)
        .await?;
    }

    for grade in &sample.grades {
        sqlx::query(
            r#"
            INSERT INTO gradebook.grades
            (id, student_id, subject, score, exam_date, exam_name, teacher_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&grade.id)
        .bind(&grade.student_id)
        .bind(&grade.subject)
        .bind(grade.score)
        .bind(grade.exam_date)
        .bind(&grade.exam_name)
        .bind(&grade.teacher_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn class_from_row(row: &PgRow) -> Class {
    Class {
        id: row.get("id"),
        grade_level: row.get("grade_level"),
        class_name: row.get("class_name"),
    }
}

fn student_from_row(row: &PgRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        student_number: row.get("student_number"),
        class_id: row.get("class_id"),
    }
}

fn grade_from_row(row: &PgRow) -> Grade {
    Grade {
        id: row.get("id"),
        student_id: row.get("student_id"),
        subject: row.get("subject"),
        score: row.get("score"),
        exam_date: row.get("exam_date"),
        exam_name: row.get("exam_name"),
        teacher_id: row.get("teacher_id"),
    }
}

const GRADE_COLUMNS: &str =
    "id, student_id, subject, score, exam_date, exam_name, teacher_id";

/// Reads the whole data set inside one REPEATABLE READ transaction so that
/// concurrent writers cannot hand the engines a torn view.
pub async fn load_snapshot(pool: &PgPool) -> anyhow::Result<GradeBook> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;

    let classes: Vec<Class> = sqlx::query(
        "SELECT id, grade_level, class_name FROM gradebook.classes ORDER BY id",
    )
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(class_from_row)
    .collect();

    let students: Vec<Student> = sqlx::query(
        "SELECT id, name, student_number, class_id FROM gradebook.students ORDER BY id",
    )
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(student_from_row)
    .collect();

    let grades: Vec<Grade> = sqlx::query(&format!(
        "SELECT {GRADE_COLUMNS} FROM gradebook.grades ORDER BY seq"
    ))
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(grade_from_row)
    .collect();

    tx.commit().await?;

    let book = GradeBook {
        classes,
        students,
        grades,
    };
    tracing::debug!(
        classes = book.classes.len(),
        students = book.students.len(),
        grades = book.grades.len(),
        "loaded snapshot"
    );
    Ok(book)
}

/// Creates the student in `class_id` when no student with `student_id` exists.
pub async fn ensure_student(
    pool: &PgPool,
    student_id: &str,
    name: &str,
    class_id: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO gradebook.students (id, name, student_number, class_id)
        VALUES ($1, $2, $1, $3)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(student_id)
    .bind(name)
    .bind(class_id)
    .execute(pool)
    .await
    .with_context(|| format!("failed to create student {student_id} in class {class_id}"))?;
    Ok(())
}

pub async fn insert_grade(pool: &PgPool, grade: &Grade) -> anyhow::Result<()> {
    anyhow::ensure!(grade.score.is_finite(), "score must be a finite number");
    sqlx::query(
        r#"
        INSERT INTO gradebook.grades
        (id, student_id, subject, score, exam_date, exam_name, teacher_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&grade.id)
    .bind(&grade.student_id)
    .bind(&grade.subject)
    .bind(grade.score)
    .bind(grade.exam_date)
    .bind(&grade.exam_name)
    .bind(&grade.teacher_id)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert grade {}", grade.id))?;
    Ok(())
}

pub async fn update_grade(
    pool: &PgPool,
    grade_id: &str,
    changes: &GradeChanges,
) -> anyhow::Result<Option<Grade>> {
    if let Some(score) = changes.score {
        anyhow::ensure!(score.is_finite(), "score must be a finite number");
    }
    let row = sqlx::query(&format!(
        r#"
        UPDATE gradebook.grades
        SET subject = COALESCE($2, subject),
            score = COALESCE($3, score),
            exam_date = COALESCE($4, exam_date),
            exam_name = COALESCE($5, exam_name)
        WHERE id = $1
        RETURNING {GRADE_COLUMNS}
        "#
    ))
    .bind(grade_id)
    .bind(changes.subject.as_deref())
    .bind(changes.score)
    .bind(changes.exam_date)
    .bind(changes.exam_name.as_deref())
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(grade_from_row))
}

pub async fn delete_grade(pool: &PgPool, grade_id: &str) -> anyhow::Result<Option<Grade>> {
    let row = sqlx::query(&format!(
        "DELETE FROM gradebook.grades WHERE id = $1 RETURNING {GRADE_COLUMNS}"
    ))
    .bind(grade_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(grade_from_row))
}

pub async fn import_rows(
    pool: &PgPool,
    parsed: ParsedImport,
    class_id: &str,
    teacher_id: &str,
) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary {
        success: true,
        imported_count: 0,
        errors: parsed.errors,
    };

    for (line, row) in parsed.rows {
        let outcome = async {
            ensure_student(pool, &row.student_number, &row.student_name, class_id).await?;
            insert_grade(pool, &row.into_grade(teacher_id)).await
        }
        .await;

        match outcome {
            Ok(()) => summary.imported_count += 1,
            Err(err) => summary.errors.push(format!("Line {line}: {err:#}")),
        }
    }

    Ok(summary)
}

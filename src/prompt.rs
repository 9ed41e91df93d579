//! Instruction text for an external AI summary service. Only report payload
//! fields are read here, so the prompts stay in step with the JSON surface.

use std::fmt::Write;

use crate::models::{ClassAnalysisReport, StudentTrendReport};

pub fn class_summary_prompt(report: &ClassAnalysisReport) -> String {
    let class = &report.class_info;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Using the grade analysis below for grade {} class {}, write a teaching summary report.",
        class.grade_level, class.class_name
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Class information:");
    let _ = writeln!(prompt, "- Class: grade {} {}", class.grade_level, class.class_name);
    let _ = writeln!(prompt, "- Students: {}", report.student_count);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Subject results:");
    for (subject, stats) in &report.subject_analysis {
        let _ = writeln!(
            prompt,
            "- {}: average {}, median {}, highest {}, lowest {}",
            subject, stats.average, stats.median, stats.max, stats.min
        );
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Cover the following points:");
    let _ = writeln!(prompt, "1. Overall learning situation of the class");
    let _ = writeln!(prompt, "2. Characteristics and problems of each subject");
    let _ = writeln!(prompt, "3. Weak areas that need attention");
    let _ = writeln!(prompt, "4. Targeted suggestions for improving teaching");
    let _ = writeln!(prompt, "5. Guidance for students at different levels");
    let _ = writeln!(prompt);
    let _ = write!(prompt, "Keep the language concise and professional.");

    prompt
}

pub fn student_advice_prompt(report: &StudentTrendReport) -> String {
    let student = &report.student_info;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Using the score trends below for {}, write personalised study advice.",
        student.name
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Student information:");
    let _ = writeln!(prompt, "- Name: {}", student.name);
    let _ = writeln!(prompt, "- Student number: {}", student.student_number);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Subject trends:");
    for (subject, trend) in &report.subject_trends {
        let _ = writeln!(
            prompt,
            "- {}: first score {}, latest score {}, total improvement {}, average progress {} per exam",
            subject, trend.first_score, trend.last_score, trend.improvement, trend.speed
        );
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Cover the following points:");
    let _ = writeln!(prompt, "1. Overall assessment of learning");
    let _ = writeln!(prompt, "2. Strengths and weaknesses per subject");
    let _ = writeln!(prompt, "3. Improvements to study methods and habits");
    let _ = writeln!(prompt, "4. Concrete strategies for weaker subjects");
    let _ = writeln!(prompt, "5. Goals and planning for the coming term");
    let _ = writeln!(prompt);
    let _ = write!(
        prompt,
        "Use a warm, professional tone suitable for sharing with the student or parents."
    );

    prompt
}

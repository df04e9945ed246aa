use clap::{Parser, Subcommand};
use coursemaster::model::entity::{
    Category, CategoryCreate, Course, CourseCreate, Lesson, LessonCreate, Section, SectionCreate,
    Step, StepCreate, UserEntity, UserEntityCreateUpdate,
};
use coursemaster::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use coursemaster::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling the CourseMaster DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage sections
    Section {
        #[command(subcommand)]
        action: SectionCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Manage steps
    Step {
        #[command(subcommand)]
        action: StepCommands,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "student")]
        role: String,
        #[arg(long, default_value = "")]
        full_name: String,
    },
}

/// Category management
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        icon: String,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// Username of the instructor who will own the course
        #[arg(long)]
        instructor: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with the course description
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "beginner")]
        level: String,
        #[arg(long, default_value_t = 0)]
        price_cents: i64,
        #[arg(long, default_value_t = false)]
        is_free: bool,
    },
}

/// Section management
#[derive(Subcommand, Debug)]
pub enum SectionCommands {
    Add {
        /// Course title to attach the section to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Section title to attach the lesson to
        #[arg(long)]
        section_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "video")]
        lesson_type: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        order_index: Option<i32>,
        #[arg(long, default_value_t = false)]
        is_preview: bool,
    },
}

/// Step management
#[derive(Subcommand, Debug)]
pub enum StepCommands {
    Add {
        /// Lesson title to attach the step to
        #[arg(long)]
        lesson_title: String,
        #[arg(long)]
        step_type: String,
        #[arg(long, default_value = "")]
        title: String,
        /// Path to a JSON file with the step content payload
        #[arg(long)]
        file: Option<String>,
        #[arg(long, default_value_t = 1)]
        points: i32,
    },
}

async fn id_by_title(
    mm: &ModelManager,
    table: &str,
    title: &str,
) -> Result<uuid::Uuid, DatabaseError> {
    let query = format!("SELECT id FROM {table} WHERE title = $1");
    let id: uuid::Uuid = sqlx::query_scalar(&query)
        .bind(title)
        .fetch_one(mm.executor())
        .await?;
    Ok(id)
}

#[tokio::main]
async fn main() -> coursemaster::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let db_con = DbConnection::connect(&std::env::var("DATABASE_URL").unwrap())?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                password,
                role,
                full_name,
            } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        password_hash: coursemaster::auth::hash_password(&password).unwrap(),
                        full_name,
                        bio: String::new(),
                        headline: String::new(),
                    },
                )
                .await?;

                let user = if role != "student" {
                    user.set_role(&mm, &actor, UserRole::from(role.as_str()))
                        .await?
                } else {
                    user
                };
                println!("User created: {:?}", user);
            }
        },

        Commands::Category { action } => match action {
            CategoryCommands::Add {
                name,
                description,
                icon,
            } => {
                let category = Category::create(
                    &mm,
                    &actor,
                    CategoryCreate {
                        name,
                        description,
                        icon,
                    },
                )
                .await?;
                println!("Category created: {:?}", category);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                instructor,
                title,
                file,
                category,
                level,
                price_cents,
                is_free,
            } => {
                let instructor = UserEntity::find_by_username(&mm, &actor, &instructor)
                    .await?
                    .expect("instructor not found");

                let category_id = match category {
                    Some(name) => {
                        let id: uuid::Uuid =
                            sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
                                .bind(&name)
                                .fetch_one(mm.executor())
                                .await
                                .map_err(DatabaseError::SqlxError)?;
                        Some(id)
                    }
                    None => None,
                };

                let description = match file {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };

                // the course is created on behalf of its instructor
                let owner = AuthenticatedUser::new(instructor.id(), instructor.role());
                let course = Course::create(
                    &mm,
                    &owner,
                    CourseCreate {
                        title,
                        subtitle: String::new(),
                        description,
                        category_id,
                        level,
                        language: String::from("English"),
                        duration_hours: 0.0,
                        price_cents,
                        discount_price_cents: None,
                        is_free,
                        learning_outcomes: String::new(),
                        requirements: String::new(),
                        target_audience: String::new(),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Section { action } => match action {
            SectionCommands::Add {
                course_title,
                title,
                description,
                order_index,
            } => {
                let course_id = id_by_title(&mm, "courses", &course_title).await?;

                let section = Section::create(
                    &mm,
                    &actor,
                    SectionCreate {
                        course_id,
                        title,
                        description,
                        order_index,
                    },
                )
                .await?;
                println!("Section created: {:?}", section);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                section_title,
                title,
                lesson_type,
                file,
                order_index,
                is_preview,
            } => {
                let section_id = id_by_title(&mm, "sections", &section_title).await?;

                let content = match file {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };

                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        section_id,
                        title,
                        lesson_type,
                        order_index,
                        content,
                        video_url: String::new(),
                        duration_minutes: 0,
                        is_preview,
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },

        Commands::Step { action } => match action {
            StepCommands::Add {
                lesson_title,
                step_type,
                title,
                file,
                points,
            } => {
                let lesson_id = id_by_title(&mm, "lessons", &lesson_title).await?;

                let content = match file {
                    Some(path) => {
                        let raw = std::fs::read_to_string(path)?;
                        Some(
                            serde_json::from_str(&raw)
                                .expect("step content file is not valid JSON"),
                        )
                    }
                    None => None,
                };

                let step = Step::create(
                    &mm,
                    &actor,
                    StepCreate {
                        lesson_id,
                        step_type,
                        title,
                        order_index: None,
                        points,
                        is_required: true,
                        content,
                    },
                )
                .await?;
                println!("Step created: {:?}", step);
            }
        },
    }

    Ok(())
}

use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use lumen_types::api::{AppProjectPatch, NewAppProject};
use lumen_types::models::AppProject;

use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, Field, col};
use crate::repo::Repo;

pub const MAX_APP_PROJECTS: usize = 3;

const PROJECT_SCHEMA: EntitySchema = EntitySchema {
    entity: "app project",
    table: "app_projects",
    primary_key: "id",
    columns: &[
        col("id"),
        col("name"),
        col("url"),
        col("description"),
        col("created_at"),
    ],
};

impl Entity for AppProject {
    const SCHEMA: &'static EntitySchema = &PROJECT_SCHEMA;
}

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

fn validate(input: &NewAppProject) -> Result<AppProject> {
    Ok(AppProject {
        id: Uuid::new_v4(),
        name: mapper::required("name", &input.name)?,
        url: mapper::required("url", &input.url)?,
        description: mapper::optional(input.description.as_deref()),
        created_at: mapper::now(),
    })
}

fn insert(conn: &Connection, project: &AppProject) -> Result<()> {
    mapper::insert(
        conn,
        &PROJECT_SCHEMA,
        &[
            ("id", mapper::text(project.id.to_string())),
            ("name", mapper::text(project.name.as_str())),
            ("url", mapper::text(project.url.as_str())),
            ("description", mapper::opt_text(project.description.clone())),
            ("created_at", mapper::stamp(project.created_at)),
        ],
    )
}

fn limit_exceeded() -> DbError {
    DbError::LimitExceeded {
        entity: PROJECT_SCHEMA.entity,
        limit: MAX_APP_PROJECTS,
    }
}

/// Showcased apps; at most [`MAX_APP_PROJECTS`] exist at once.
#[derive(Clone)]
pub struct AppProjectRepository {
    repo: Repo,
}

impl AppProjectRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    pub fn create(&self, input: NewAppProject) -> Result<AppProject> {
        let project = validate(&input)?;

        self.repo.write(|conn| {
            if mapper::count(conn, &PROJECT_SCHEMA, "")? as usize >= MAX_APP_PROJECTS {
                return Err(limit_exceeded());
            }
            insert(conn, &project)
        })?;

        info!("App project '{}' added", project.name);
        Ok(project)
    }

    /// Swap the whole set in one transaction.
    pub fn replace_all(&self, inputs: Vec<NewAppProject>) -> Result<Vec<AppProject>> {
        if inputs.len() > MAX_APP_PROJECTS {
            return Err(limit_exceeded());
        }
        let projects = inputs.iter().map(validate).collect::<Result<Vec<_>>>()?;

        self.repo.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM app_projects", [])?;
            for project in &projects {
                insert(&tx, project)?;
            }
            tx.commit()?;
            Ok(())
        })?;

        info!("App projects replaced ({} total)", projects.len());
        self.find_all()
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<AppProject>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "id", &id.to_string()))
    }

    pub fn find_all(&self) -> Result<Vec<AppProject>> {
        self.repo.read(|conn| mapper::find_many(conn, NEWEST_FIRST, &[]))
    }

    pub fn update(&self, id: Uuid, patch: &AppProjectPatch) -> Result<Option<AppProject>> {
        let mut fields: Vec<Field> = Vec::new();
        if let Some(name) = &patch.name {
            fields.push(("name", mapper::text(mapper::required("name", name)?)));
        }
        if let Some(url) = &patch.url {
            fields.push(("url", mapper::text(mapper::required("url", url)?)));
        }
        if let Some(description) = &patch.description {
            fields.push(("description", mapper::opt_text(mapper::optional(Some(description.as_str())))));
        }
        if fields.is_empty() {
            return self.find_by_id(id);
        }

        self.repo.write(|conn| {
            if !mapper::update_fields(conn, &PROJECT_SCHEMA, &id.to_string(), &fields)? {
                return Ok(None);
            }
            mapper::find_one(conn, "id", &id.to_string())
        })
    }

    pub fn delete(&self, id: Uuid) -> Result<Option<AppProject>> {
        let Some(existing) = self.find_by_id(id)? else {
            return Ok(None);
        };
        self.repo
            .write(|conn| mapper::delete_where(conn, &PROJECT_SCHEMA, "id", &id.to_string()))?;
        info!("App project '{}' removed", existing.name);
        Ok(Some(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testing::repositories;

    fn project(name: &str) -> NewAppProject {
        NewAppProject {
            name: name.to_string(),
            url: format!("https://{}.example.com", name.to_lowercase()),
            description: None,
        }
    }

    #[test]
    fn fourth_project_is_rejected() {
        let (_dir, repos) = repositories();
        for name in ["One", "Two", "Three"] {
            repos.projects.create(project(name)).unwrap();
        }
        let backing = repos.persistence.backing_path().unwrap();
        let before = std::fs::read(&backing).unwrap();

        let err = repos.projects.create(project("Four")).unwrap_err();
        assert!(matches!(err, DbError::LimitExceeded { limit: 3, .. }));
        assert_eq!(repos.projects.find_all().unwrap().len(), 3);
        assert_eq!(std::fs::read(&backing).unwrap(), before);
    }

    #[test]
    fn delete_frees_a_slot() {
        let (_dir, repos) = repositories();
        let first = repos.projects.create(project("One")).unwrap();
        repos.projects.create(project("Two")).unwrap();
        repos.projects.create(project("Three")).unwrap();

        assert_eq!(repos.projects.delete(first.id).unwrap(), Some(first));
        repos.projects.create(project("Four")).unwrap();
        assert_eq!(repos.projects.find_all().unwrap().len(), 3);
    }

    #[test]
    fn replace_all_swaps_the_set() {
        let (_dir, repos) = repositories();
        repos.projects.create(project("Old")).unwrap();

        let replaced = repos
            .projects
            .replace_all(vec![project("A"), project("B")])
            .unwrap();
        let mut names: Vec<String> = replaced.into_iter().map(|p| p.name).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn replace_all_over_limit_changes_nothing() {
        let (_dir, repos) = repositories();
        let kept = repos.projects.create(project("Kept")).unwrap();

        let err = repos
            .projects
            .replace_all(vec![project("A"), project("B"), project("C"), project("D")])
            .unwrap_err();
        assert!(matches!(err, DbError::LimitExceeded { .. }));

        let invalid = repos
            .projects
            .replace_all(vec![project("A"), NewAppProject { name: "".into(), url: "x".into(), description: None }])
            .unwrap_err();
        assert!(matches!(invalid, DbError::Validation(_)));

        assert_eq!(repos.projects.find_all().unwrap(), vec![kept]);
    }

    #[test]
    fn update_changes_given_fields() {
        let (_dir, repos) = repositories();
        let p = repos.projects.create(project("One")).unwrap();
        let updated = repos
            .projects
            .update(
                p.id,
                &AppProjectPatch {
                    description: Some("Our first app".into()),
                    ..AppProjectPatch::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "One");
        assert_eq!(updated.description.as_deref(), Some("Our first app"));
        assert!(repos.projects.update(Uuid::new_v4(), &AppProjectPatch::default()).unwrap().is_none());
    }
}

//! Workspace storage: workspaces, projects, membership and display names.

use std::collections::HashMap;

use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::model::{Member, MemberStatus, Profile, Project, Workspace};

use super::{Result, Storage, StorageError, parse_uuid};

impl Storage {
    /// Inserts or renames a workspace.
    pub fn upsert_workspace(&self, workspace: &Workspace) -> Result<()> {
        self.conn.execute(
            "INSERT INTO workspaces (id, name) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
            rusqlite::params![workspace.id.to_string(), &workspace.name],
        )?;
        Ok(())
    }

    /// Inserts or updates a project.
    pub fn upsert_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (id, workspace_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE
             SET workspace_id = excluded.workspace_id, name = excluded.name",
            rusqlite::params![
                project.id.to_string(),
                project.workspace_id.to_string(),
                &project.name,
            ],
        )?;
        Ok(())
    }

    /// Loads a project, mainly to find the workspace that owns it.
    pub fn load_project(&self, id: Uuid) -> Result<Project> {
        let row = self
            .conn
            .query_row(
                "SELECT workspace_id, name FROM projects WHERE id = ?1",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let (workspace_id, name) = row.ok_or(StorageError::ProjectNotFound(id))?;
        Ok(Project {
            id,
            workspace_id: parse_uuid(&workspace_id, "project workspace_id")?,
            name,
        })
    }

    /// Inserts or updates a workspace membership.
    pub fn upsert_member(&self, member: &Member) -> Result<()> {
        self.conn.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, status) VALUES (?1, ?2, ?3)
             ON CONFLICT (workspace_id, user_id) DO UPDATE SET status = excluded.status",
            rusqlite::params![
                member.workspace_id.to_string(),
                member.user_id.to_string(),
                member.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Returns the user's membership status in a workspace, if any.
    pub fn member_status(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<MemberStatus>> {
        let status = self
            .conn
            .query_row(
                "SELECT status FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
                [workspace_id.to_string(), user_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        status
            .map(|s| {
                MemberStatus::parse(&s)
                    .ok_or_else(|| StorageError::Corrupt(format!("unknown member status: {s}")))
            })
            .transpose()
    }

    /// Inserts or updates a user's display name.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (user_id, display_name) VALUES (?1, ?2)
             ON CONFLICT (user_id) DO UPDATE SET display_name = excluded.display_name",
            rusqlite::params![profile.user_id.to_string(), &profile.display_name],
        )?;
        Ok(())
    }

    /// Looks up display names for a set of users.
    ///
    /// Users without a profile are simply missing from the map.
    pub fn display_names(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT display_name FROM profiles WHERE user_id = ?1")?;
        let mut names = HashMap::new();
        for id in user_ids {
            if names.contains_key(id) {
                continue;
            }
            let name = stmt
                .query_row([id.to_string()], |row| row.get::<_, String>(0))
                .optional()?;
            if let Some(name) = name {
                names.insert(*id, name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::test_support::test_storage;

    #[test]
    fn load_project_returns_owner_workspace() {
        let (_dir, storage) = test_storage();
        let project = Project {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            name: "Seed round".into(),
        };

        storage.upsert_project(&project).unwrap();

        assert_eq!(storage.load_project(project.id).unwrap(), project);
    }

    #[test]
    fn load_nonexistent_project_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.load_project(Uuid::new_v4()).unwrap_err();

        assert!(matches!(err, StorageError::ProjectNotFound(_)));
    }

    #[test]
    fn member_status_tracks_latest_upsert() {
        let (_dir, storage) = test_storage();
        let mut member = Member {
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: MemberStatus::Invited,
        };

        assert_eq!(
            storage
                .member_status(member.workspace_id, member.user_id)
                .unwrap(),
            None
        );

        storage.upsert_member(&member).unwrap();
        member.status = MemberStatus::Active;
        storage.upsert_member(&member).unwrap();

        assert_eq!(
            storage
                .member_status(member.workspace_id, member.user_id)
                .unwrap(),
            Some(MemberStatus::Active)
        );
    }

    #[test]
    fn display_names_skips_unknown_users() {
        let (_dir, storage) = test_storage();
        let known = Uuid::new_v4();
        storage
            .upsert_profile(&Profile {
                user_id: known,
                display_name: "Ada".into(),
            })
            .unwrap();

        let names = storage.display_names(&[known, Uuid::new_v4()]).unwrap();

        assert_eq!(names.len(), 1);
        assert_eq!(names[&known], "Ada");
    }
}

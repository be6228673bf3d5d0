//! CRUD operations for [`Profile`] records and the user purge cascade.

use rusqlite::{params, OptionalExtension};

use exportdesk_shared::{Role, UserId};

use crate::database::{decode_ts, encode_ts, now, Database};
use crate::error::{Result, StoreError};
use crate::models::{Profile, ProfileUpdate, PurgeReport};

const PROFILE_COLUMNS: &str = "user_id, username, email, phone, company_name, country, state,
     city, user_code, role, active, created_at, updated_at";

impl Database {
    /// Insert a profile unless the user id already has one.
    pub fn insert_profile(&self, profile: &Profile) -> Result<()> {
        let affected = self.conn().execute(
            &format!(
                "INSERT INTO profiles ({PROFILE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(user_id) DO NOTHING"
            ),
            params![
                profile.user_id.to_string(),
                profile.username,
                profile.email,
                profile.phone,
                profile.company_name,
                profile.country,
                profile.state,
                profile.city,
                profile.user_code,
                profile.role.as_str(),
                profile.active,
                encode_ts(&profile.created_at),
                encode_ts(&profile.updated_at),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::DuplicateProfile(profile.user_id.to_string()));
        }
        Ok(())
    }

    /// Insert a profile, or replace every column but `created_at`.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO profiles ({PROFILE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(user_id) DO UPDATE SET
                     username = excluded.username,
                     email = excluded.email,
                     phone = excluded.phone,
                     company_name = excluded.company_name,
                     country = excluded.country,
                     state = excluded.state,
                     city = excluded.city,
                     user_code = excluded.user_code,
                     role = excluded.role,
                     active = excluded.active,
                     updated_at = excluded.updated_at"
            ),
            params![
                profile.user_id.to_string(),
                profile.username,
                profile.email,
                profile.phone,
                profile.company_name,
                profile.country,
                profile.state,
                profile.city,
                profile.user_code,
                profile.role.as_str(),
                profile.active,
                encode_ts(&profile.created_at),
                encode_ts(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id.to_string()],
                ProfileRow::from_row,
            )
            .optional()?;
        row.map(ProfileRow::into_profile).transpose()
    }

    /// List all profiles, newest first.
    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], ProfileRow::from_row)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?.into_profile()?);
        }
        Ok(profiles)
    }

    pub fn set_profile_active(&self, user_id: UserId, active: bool) -> Result<Profile> {
        let affected = self.conn().execute(
            "UPDATE profiles SET active = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![active, encode_ts(&now()), user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_profile(user_id)?.ok_or(StoreError::NotFound)
    }

    /// Rewrite the contact columns of one profile.  Role, code and the
    /// active flag are left alone.
    pub fn update_profile(&mut self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile> {
        let tx = self.conn_mut().transaction()?;
        let row = tx
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id.to_string()],
                ProfileRow::from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;
        let mut profile = row.into_profile()?;
        update.apply_to(&mut profile);
        profile.updated_at = now();

        tx.execute(
            "UPDATE profiles
             SET username = ?2, email = ?3, phone = ?4, company_name = ?5,
                 country = ?6, state = ?7, city = ?8, updated_at = ?9
             WHERE user_id = ?1",
            params![
                user_id.to_string(),
                profile.username,
                profile.email,
                profile.phone,
                profile.company_name,
                profile.country,
                profile.state,
                profile.city,
                encode_ts(&profile.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok(profile)
    }

    /// Delete a user's profile, RFQs and messages in one transaction.
    pub fn purge_user(&mut self, user_id: UserId) -> Result<PurgeReport> {
        let uid = user_id.to_string();
        let tx = self.conn_mut().transaction()?;

        let messages_deleted = tx.execute(
            "DELETE FROM messages
             WHERE sender_id = ?1
                OR rfq_id IN (SELECT id FROM rfqs WHERE user_id = ?1)",
            params![uid],
        )?;
        let rfqs_deleted = tx.execute("DELETE FROM rfqs WHERE user_id = ?1", params![uid])?;
        let profiles_deleted =
            tx.execute("DELETE FROM profiles WHERE user_id = ?1", params![uid])?;

        tx.commit()?;

        Ok(PurgeReport {
            rfqs_deleted: rfqs_deleted as u64,
            messages_deleted: messages_deleted as u64,
            profile_deleted: profiles_deleted > 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct ProfileRow {
    user_id: String,
    username: String,
    email: String,
    phone: String,
    company_name: Option<String>,
    country: String,
    state: String,
    city: String,
    user_code: String,
    role: String,
    active: bool,
    created_at: String,
    updated_at: String,
}

impl ProfileRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            company_name: row.get(4)?,
            country: row.get(5)?,
            state: row.get(6)?,
            city: row.get(7)?,
            user_code: row.get(8)?,
            role: row.get(9)?,
            active: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_profile(self) -> Result<Profile> {
        Ok(Profile {
            user_id: self.user_id.parse()?,
            username: self.username,
            email: self.email,
            phone: self.phone,
            company_name: self.company_name,
            country: self.country,
            state: self.state,
            city: self.city,
            user_code: self.user_code,
            role: self.role.parse::<Role>()?,
            active: self.active,
            created_at: decode_ts(&self.created_at)?,
            updated_at: decode_ts(&self.updated_at)?,
        })
    }
}

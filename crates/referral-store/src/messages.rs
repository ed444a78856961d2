use rusqlite::params;

use referral_shared::{DoctorId, MessageId};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::Message;
use crate::rows::{format_timestamp, now, parse_timestamp};

impl Database {
    pub fn insert_message(
        &self,
        sender: DoctorId,
        receiver: DoctorId,
        content: &str,
        file_path: Option<&str>,
    ) -> Result<Message> {
        let now = now();

        self.conn().execute(
            "INSERT INTO messages (sender_id, receiver_id, content, file_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![sender.0, receiver.0, content, file_path, format_timestamp(&now)],
        )?;

        Ok(Message {
            id: MessageId(self.conn().last_insert_rowid()),
            sender_id: sender,
            receiver_id: receiver,
            content: content.to_string(),
            file_path: file_path.map(str::to_string),
            created_at: now,
        })
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, sender_id, receiver_id, content, file_path, created_at
                 FROM messages WHERE id = ?1",
                params![id.0],
                row_to_message,
            )
            .map_err(not_found)
    }

    /// Every message exchanged between `a` and `b`, oldest first.
    ///
    /// No pagination: the whole thread is returned on each call.
    pub fn get_history(&self, a: DoctorId, b: DoctorId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender_id, receiver_id, content, file_path, created_at
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![a.0, b.0], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let created_str: String = row.get(5)?;

    Ok(Message {
        id: MessageId(row.get(0)?),
        sender_id: DoctorId(row.get(1)?),
        receiver_id: DoctorId(row.get(2)?),
        content: row.get(3)?,
        file_path: row.get(4)?,
        created_at: parse_timestamp(5, &created_str)?,
    })
}

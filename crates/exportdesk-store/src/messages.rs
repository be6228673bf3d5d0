use rusqlite::params;

use exportdesk_shared::{MessageId, RfqId, SenderType};

use crate::database::{decode_ts, encode_ts, now, Database};
use crate::error::{Result, StoreError};
use crate::models::{Message, NewMessage};

impl Database {
    pub fn insert_message(&self, new: &NewMessage) -> Result<Message> {
        if self.get_rfq(new.rfq_id)?.is_none() {
            return Err(StoreError::MissingReference(format!("rfq {}", new.rfq_id)));
        }

        let message = Message {
            id: MessageId::new(),
            rfq_id: new.rfq_id,
            sender_type: new.sender_type,
            sender_id: new.sender_id,
            text: new.text.clone(),
            created_at: now(),
        };

        self.conn().execute(
            "INSERT INTO messages (id, rfq_id, sender_type, sender_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                message.rfq_id.to_string(),
                message.sender_type.as_str(),
                message.sender_id.to_string(),
                message.text,
                encode_ts(&message.created_at),
            ],
        )?;
        Ok(message)
    }

    /// Full thread for an RFQ.  Equal timestamps keep insertion order.
    pub fn get_messages_for_rfq(&self, rfq_id: RfqId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, rfq_id, sender_type, sender_id, text, created_at
             FROM messages
             WHERE rfq_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![rfq_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, rfq_id, sender_type, sender_id, text, created_at) = row?;
            messages.push(Message {
                id: id.parse()?,
                rfq_id: rfq_id.parse()?,
                sender_type: sender_type.parse::<SenderType>()?,
                sender_id: sender_id.parse()?,
                text,
                created_at: decode_ts(&created_at)?,
            });
        }
        Ok(messages)
    }
}

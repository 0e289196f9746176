//! The single fixed record type this engine stores.
//!
//! Serialized width is byte-exact and load-bearing for file compatibility:
//! `ID_SIZE + USERNAME_SIZE + EMAIL_SIZE == ROW_SIZE == 293`. The username
//! and email buffers are one byte wider than their logical character limits
//! to hold a NUL terminator, mirroring the C struct this format was
//! distilled from.

pub const ID_SIZE: usize = 4;
pub const USERNAME_MAX_CHARS: usize = 32;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const USERNAME_SIZE: usize = USERNAME_MAX_CHARS + 1;
pub const EMAIL_SIZE: usize = EMAIL_MAX_CHARS + 1;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    username: [u8; USERNAME_SIZE],
    email: [u8; EMAIL_SIZE],
}

/// Why a candidate row was rejected before it ever reached the B-tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    StringTooLong,
}

impl Row {
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self, RowError> {
        if username.as_bytes().len() > USERNAME_MAX_CHARS || email.as_bytes().len() > EMAIL_MAX_CHARS
        {
            return Err(RowError::StringTooLong);
        }

        let mut username_buf = [0u8; USERNAME_SIZE];
        username_buf[..username.len()].copy_from_slice(username.as_bytes());

        let mut email_buf = [0u8; EMAIL_SIZE];
        email_buf[..email.len()].copy_from_slice(email.as_bytes());

        Ok(Row {
            id,
            username: username_buf,
            email: email_buf,
        })
    }

    pub fn username(&self) -> String {
        trimmed(&self.username)
    }

    pub fn email(&self) -> String {
        trimmed(&self.email)
    }

    pub fn serialize(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[0..ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        buf[ID_SIZE..ID_SIZE + USERNAME_SIZE].copy_from_slice(&self.username);
        buf[ID_SIZE + USERNAME_SIZE..ROW_SIZE].copy_from_slice(&self.email);
        buf
    }

    pub fn deserialize(buf: &[u8; ROW_SIZE]) -> Self {
        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&buf[0..ID_SIZE]);

        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&buf[ID_SIZE..ID_SIZE + USERNAME_SIZE]);

        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&buf[ID_SIZE + USERNAME_SIZE..ROW_SIZE]);

        Row {
            id: u32::from_le_bytes(id_bytes),
            username,
            email,
        }
    }
}

fn trimmed(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}

//! Portal endpoint surface
//!
//! Thin wrappers over [`ApiClient::request`] for every REST endpoint
//! the portal exposes. All of them go through the same dispatch path,
//! so bearer auth, refresh-and-replay and error mapping apply
//! uniformly. Responses are contractually JSON.

use portico_domain::{ApiError, RequestDescriptor};
use serde_json::Value;

use crate::client::ApiClient;
use crate::ports::{HttpTransport, TokenStore};

impl<T, S> ApiClient<T, S>
where
    T: HttpTransport,
    S: TokenStore,
{
    /// Fetches the authenticated student's profile.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn student_profile(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/auth/student-profile/"))
            .await
    }

    /// Lists library books, optionally filtered. Pairs are encoded
    /// into the query string in order.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; an unencodable filter pair is a
    /// [`ApiError::Network`] error.
    pub async fn books(&self, filters: &[(&str, &str)]) -> Result<Value, ApiError> {
        let endpoint = if filters.is_empty() {
            "/api/library/books/".to_string()
        } else {
            let query = serde_urlencoded::to_string(filters).map_err(|err| {
                ApiError::network(format!("Failed to encode book filters: {err}"))
            })?;
            format!("/api/library/books/?{query}")
        };
        self.request_json(RequestDescriptor::get(endpoint)).await
    }

    /// Fetches a single book.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn book(&self, book_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get(format!("/api/library/books/{book_id}/")))
            .await
    }

    /// Borrows a book.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn borrow_book(&self, book_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/library/books/{book_id}/borrow/"
        )))
        .await
    }

    /// Reserves a book that is currently unavailable.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn reserve_book(&self, book_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/library/books/{book_id}/reserve/"
        )))
        .await
    }

    /// Lists the student's active loans.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn borrowed_books(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/library/loans/my_loans/"))
            .await
    }

    /// Returns a borrowed book.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn return_book(&self, loan_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/library/loans/{loan_id}/return_book/"
        )))
        .await
    }

    /// Renews a loan.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn renew_book(&self, loan_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/library/loans/{loan_id}/renew/"
        )))
        .await
    }

    /// Lists the student's reservations.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn my_reservations(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get(
            "/api/library/reservations/my_reservations/",
        ))
        .await
    }

    /// Cancels a reservation.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn cancel_reservation(&self, reservation_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/library/reservations/{reservation_id}/cancel/"
        )))
        .await
    }

    /// Lists the course catalog.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn courses(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/courses/courses/"))
            .await
    }

    /// Lists the student's course registrations.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn registered_courses(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/courses/registrations/"))
            .await
    }

    /// Registers for a course.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn register_course(&self, course_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/courses/courses/{course_id}/register/"
        )))
        .await
    }

    /// Drops a registered course.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn drop_course(&self, course_id: u64) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post_empty(format!(
            "/api/courses/courses/{course_id}/drop/"
        )))
        .await
    }

    /// Fetches the student's exam results.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn results(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/results/results/"))
            .await
    }

    /// Fetches the class schedule.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn schedule(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/courses/schedules/"))
            .await
    }

    /// Fetches notices published to students.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn notices(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/courses/notices/"))
            .await
    }

    /// Lists the student's todos.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn todos(&self) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::get("/api/todos/todos/")).await
    }

    /// Creates a todo from the given payload.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn create_todo(&self, todo: Value) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::post("/api/todos/todos/", todo))
            .await
    }

    /// Applies a partial update to a todo.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`], per the client taxonomy.
    pub async fn update_todo(&self, todo_id: u64, updates: Value) -> Result<Value, ApiError> {
        self.request_json(RequestDescriptor::patch(
            format!("/api/todos/todos/{todo_id}/"),
            updates,
        ))
        .await
    }

    /// Dispatches and insists on a JSON body, which every portal
    /// endpoint returns.
    async fn request_json(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        self.request(request).await?.into_json()
    }
}
